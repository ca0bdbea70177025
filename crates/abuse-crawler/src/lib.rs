//! The ingestion pipeline: paginated GraphQL fetching with retry and a
//! wall-clock budget, per-record trust filtering and dedup, per-partition
//! checkpoints, and a sequential partition orchestrator.
//!
//! Storage is reached only through [`abuse_core::store::RecordStore`] and
//! [`abuse_core::checkpoint::CheckpointStore`]; HTTP only through
//! [`transport::Transport`].

pub mod checkpoint;
pub mod error;
pub mod fetcher;
pub mod orchestrator;
pub mod processor;
pub mod retry;
pub mod transport;
pub mod wire;

pub use error::{CheckpointError, FetchError, PartitionError, RecordError};
pub use orchestrator::{Orchestrator, PartitionStats, PartitionStatus, RunStats, StopReason};

#[cfg(test)]
mod test_support;
