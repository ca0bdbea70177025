//! Error types for `abuse-crawler`.
//!
//! Each type marks a blast radius: [`RecordError`] never escapes the record
//! being processed, [`PartitionError`] never escapes the partition being
//! crawled. [`FetchError::Protocol`] ends a partition's pagination without
//! failing it.

use thiserror::Error;

/// HTTP statuses treated as transient upstream failures.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Upstream bodies are truncated to this many characters in errors and logs.
const MAX_BODY_CHARS: usize = 512;

#[derive(Debug, Error)]
pub enum FetchError {
  /// The request never produced an HTTP response.
  #[error("transport error: {0}")]
  Transport(String),

  #[error("upstream returned HTTP {status}: {body}")]
  Upstream { status: u16, body: String },

  /// GraphQL `errors`, or a payload without `data.reports.edges`.
  #[error("protocol error: {0}")]
  Protocol(String),

  #[error("giving up after {retries} retries: {last}")]
  RetriesExhausted {
    retries: u32,
    #[source]
    last:    Box<FetchError>,
  },
}

impl FetchError {
  pub fn upstream(status: u16, body: &str) -> Self {
    Self::Upstream { status, body: truncate(body) }
  }

  /// Whether another attempt may succeed.
  pub fn is_retryable(&self) -> bool {
    match self {
      Self::Transport(_) => true,
      Self::Upstream { status, .. } => RETRYABLE_STATUSES.contains(status),
      Self::Protocol(_) | Self::RetriesExhausted { .. } => false,
    }
  }
}

/// Failure to map or persist a single report.
#[derive(Debug, Error)]
pub enum RecordError {
  #[error("malformed report edge: {0}")]
  Malformed(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Debug, Error)]
pub enum CheckpointError {
  #[error("checkpoint io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("checkpoint json error: {0}")]
  Json(#[from] serde_json::Error),
}

/// Anything that aborts one partition's run.
#[derive(Debug, Error)]
pub enum PartitionError {
  #[error("fetch failed: {0}")]
  Fetch(#[from] FetchError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

fn truncate(body: &str) -> String {
  match body.char_indices().nth(MAX_BODY_CHARS) {
    Some((idx, _)) => format!("{}…", &body[..idx]),
    None => body.to_owned(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn retryable_statuses_and_transport_errors() {
    for status in RETRYABLE_STATUSES {
      assert!(FetchError::upstream(status, "").is_retryable(), "{status}");
    }
    assert!(!FetchError::upstream(400, "").is_retryable());
    assert!(!FetchError::upstream(401, "").is_retryable());
    assert!(FetchError::Transport("connection reset".into()).is_retryable());
    assert!(!FetchError::Protocol("errors".into()).is_retryable());
  }

  #[test]
  fn long_upstream_bodies_are_truncated() {
    let body = "x".repeat(2000);
    let FetchError::Upstream { body, .. } = FetchError::upstream(500, &body) else {
      panic!("expected upstream error");
    };
    assert_eq!(body.chars().count(), MAX_BODY_CHARS + 1);
    assert!(body.ends_with('…'));
  }
}
