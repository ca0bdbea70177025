//! Per-partition resumption state and the [`CheckpointStore`] trait.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where pagination for one partition should resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
  pub partition:  String,
  /// Opaque upstream pagination token (`pageInfo.endCursor`).
  pub cursor:     String,
  /// Pages processed since pagination last started from the first page.
  pub page_count: u64,
  /// Set once pagination for the partition ran to its end. A completed
  /// checkpoint is not resumed from; the next run starts over.
  #[serde(default)]
  pub completed:  bool,
  pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
  pub fn new(partition: impl Into<String>, cursor: impl Into<String>, page_count: u64) -> Self {
    Self {
      partition: partition.into(),
      cursor: cursor.into(),
      page_count,
      completed: false,
      updated_at: Utc::now(),
    }
  }

  /// Mark pagination for this partition as finished.
  pub fn completed(mut self) -> Self {
    self.completed = true;
    self
  }

  /// The cursor to resume from, unless the partition already finished.
  pub fn resume_cursor(&self) -> Option<&str> {
    (!self.completed && !self.cursor.is_empty()).then_some(self.cursor.as_str())
  }
}

/// Abstraction over checkpoint persistence.
///
/// Checkpoints are overwritten after every processed page and never deleted
/// by the crawler. A missing checkpoint means "start from the beginning".
pub trait CheckpointStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Load the last saved checkpoint for `partition`, if any.
  fn load<'a>(
    &'a self,
    partition: &'a str,
  ) -> impl Future<Output = Result<Option<Checkpoint>, Self::Error>> + Send + 'a;

  /// Persist `checkpoint`, replacing any previous one for its partition.
  fn save<'a>(
    &'a self,
    checkpoint: &'a Checkpoint,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
