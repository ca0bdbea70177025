//! Error types for `abuse-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown parse mode: {0:?} (expected FULL or NEW_ONLY)")]
  UnknownParseMode(String),

  #[error("unknown sort direction: {0:?} (expected ASC or DESC)")]
  UnknownSortDirection(String),

  #[error("invalid configuration: {0}")]
  InvalidConfig(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
