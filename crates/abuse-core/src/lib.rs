//! Domain types, run configuration and storage traits shared by the
//! crawler, its SQLite backend and the binary.
//!
//! No HTTP or database code lives here.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod report;
pub mod store;

pub use error::{Error, Result};
