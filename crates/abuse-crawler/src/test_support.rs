//! Shared fixtures for unit tests: a scripted transport and JSON builders.

use std::{
  collections::{HashMap, VecDeque},
  sync::Mutex,
  time::Duration,
};

use abuse_core::{
  checkpoint::{Checkpoint, CheckpointStore},
  config::RunConfig,
};
use serde_json::{Value, json};
use tokio::time::Instant;

use crate::{
  CheckpointError, FetchError,
  transport::{RawResponse, Transport},
};

pub fn test_config() -> RunConfig {
  RunConfig {
    api_token: "test-token".into(),
    partitions: vec!["ETH".into()],
    request_delay: Duration::ZERO,
    ..RunConfig::default()
  }
}

// ─── JSON builders ───────────────────────────────────────────────────────────

/// A report edge with one address on the node's chain.
pub fn report_edge(id: &str, trusted: bool) -> Value {
  json!({
    "node": {
      "id": id,
      "isPrivate": false,
      "createdAt": "2024-05-01T10:00:00.000Z",
      "scamCategory": "PHISHING",
      "categoryDescription": null,
      "biDirectionalVoteCount": 2,
      "viewerDidVote": false,
      "description": format!("report {id}"),
      "commentsCount": 0,
      "source": "USER",
      "checked": true,
      "reportedBy": { "id": "u1", "username": "alice", "trusted": trusted },
      "addresses": [
        { "id": format!("{id}-addr"), "address": format!("0x{id}"), "chain": "ETH" }
      ]
    }
  })
}

pub fn page_body(edges: &[Value], end_cursor: Option<&str>, has_next: bool) -> Value {
  json!({
    "data": {
      "reports": {
        "pageInfo": { "hasNextPage": has_next, "endCursor": end_cursor },
        "edges": edges,
      }
    }
  })
}

// ─── Scripted transport ──────────────────────────────────────────────────────

enum Scripted {
  Response(u16, String),
  TransportError(String),
}

/// Replays queued responses per partition and records every request.
///
/// A partition with nothing queued answers `404`, which the fetcher treats as
/// a non-retryable failure.
#[derive(Default)]
pub struct ScriptedTransport {
  queues:   Mutex<HashMap<String, VecDeque<Scripted>>>,
  requests: Mutex<Vec<(Instant, Value)>>,
}

impl ScriptedTransport {
  fn push(&self, partition: &str, item: Scripted) {
    self
      .queues
      .lock()
      .unwrap()
      .entry(partition.to_owned())
      .or_default()
      .push_back(item);
  }

  pub fn push_ok(&self, partition: &str, body: Value) {
    self.push(partition, Scripted::Response(200, body.to_string()));
  }

  pub fn push_status(&self, partition: &str, status: u16) {
    self.push(partition, Scripted::Response(status, format!("status {status}")));
  }

  pub fn push_transport_error(&self, partition: &str, message: &str) {
    self.push(partition, Scripted::TransportError(message.to_owned()));
  }

  pub fn request_times(&self) -> Vec<Instant> {
    self.requests.lock().unwrap().iter().map(|(t, _)| *t).collect()
  }

  /// The `after` variable of every request made for `partition`.
  pub fn cursors(&self, partition: &str) -> Vec<Option<String>> {
    self
      .requests
      .lock()
      .unwrap()
      .iter()
      .filter(|(_, body)| partition_of(body) == partition)
      .map(|(_, body)| body["variables"]["after"].as_str().map(str::to_owned))
      .collect()
  }

  pub fn request_count(&self, partition: &str) -> usize { self.cursors(partition).len() }
}

fn partition_of(body: &Value) -> &str {
  body["variables"]["input"]["chains"][0].as_str().unwrap_or_default()
}

impl Transport for ScriptedTransport {
  async fn post(&self, body: &Value) -> Result<RawResponse, FetchError> {
    self.requests.lock().unwrap().push((Instant::now(), body.clone()));

    let next = self
      .queues
      .lock()
      .unwrap()
      .get_mut(partition_of(body))
      .and_then(VecDeque::pop_front);

    match next {
      Some(Scripted::Response(status, body)) => Ok(RawResponse { status, body }),
      Some(Scripted::TransportError(message)) => Err(FetchError::Transport(message)),
      None => Ok(RawResponse { status: 404, body: "nothing scripted".into() }),
    }
  }
}

// ─── In-memory checkpoints ───────────────────────────────────────────────────

/// Checkpoints kept in a map; `fail_saves` makes every save error.
#[derive(Default)]
pub struct MemoryCheckpoints {
  saved:      Mutex<HashMap<String, Checkpoint>>,
  fail_saves: bool,
}

impl MemoryCheckpoints {
  pub fn failing() -> Self { Self { fail_saves: true, ..Self::default() } }

  pub fn get(&self, partition: &str) -> Option<Checkpoint> {
    self.saved.lock().unwrap().get(partition).cloned()
  }

  pub fn put(&self, checkpoint: Checkpoint) {
    self.saved.lock().unwrap().insert(checkpoint.partition.clone(), checkpoint);
  }
}

impl CheckpointStore for MemoryCheckpoints {
  type Error = CheckpointError;

  async fn load(&self, partition: &str) -> Result<Option<Checkpoint>, CheckpointError> {
    Ok(self.get(partition))
  }

  async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
    if self.fail_saves {
      return Err(std::io::Error::other("disk full").into());
    }
    self.put(checkpoint.clone());
    Ok(())
  }
}
