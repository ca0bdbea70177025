//! Per-page record handling: trust filter, existence check, early stop and
//! the multi-table write for accepted reports.

use std::{ops::AddAssign, sync::Arc};

use abuse_core::{config::RunConfig, store::RecordStore};
use serde::Deserialize as _;
use serde_json::Value;

use crate::{RecordError, wire::Edge};

/// Counters for one page (or, summed, for a whole partition).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageStats {
  /// Trusted, new reports written to the store.
  pub accepted:          u64,
  /// Untrusted or already-stored reports.
  pub skipped:           u64,
  /// Reports that failed to decode or write.
  pub failed:            u64,
  pub addresses_written: u64,
}

impl AddAssign for PageStats {
  fn add_assign(&mut self, rhs: Self) {
    self.accepted += rhs.accepted;
    self.skipped += rhs.skipped;
    self.failed += rhs.failed;
    self.addresses_written += rhs.addresses_written;
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageOutcome {
  pub stats:      PageStats,
  /// Set when incremental mode saw enough consecutive stored reports that
  /// the rest of the partition is assumed to be old.
  pub early_stop: bool,
}

/// What happened to a single edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
  Accepted { addresses: u64 },
  Untrusted,
  Existing,
}

/// Applies filtering and dedup to pages of report edges.
pub struct Processor<S> {
  store:  Arc<S>,
  config: Arc<RunConfig>,
}

impl<S: RecordStore> Processor<S> {
  pub fn new(store: Arc<S>, config: Arc<RunConfig>) -> Self { Self { store, config } }

  /// Process every edge of one page fetched under `partition`.
  ///
  /// A failing edge is logged and counted; it never aborts the page. In
  /// incremental mode the page is abandoned as soon as the run of
  /// consecutive stored reports reaches the configured threshold.
  pub async fn process_page(&self, edges: &[Value], partition: &str) -> PageOutcome {
    let incremental = self.config.mode.is_incremental();
    let threshold = u64::from(self.config.max_consecutive_existing);

    let mut outcome = PageOutcome::default();
    let mut consecutive_existing = 0u64;

    for (index, edge) in edges.iter().enumerate() {
      match self.process_edge(edge, partition).await {
        Ok(Disposition::Accepted { addresses }) => {
          outcome.stats.accepted += 1;
          outcome.stats.addresses_written += addresses;
          consecutive_existing = 0;
        }
        Ok(Disposition::Untrusted) => outcome.stats.skipped += 1,
        Ok(Disposition::Existing) => {
          outcome.stats.skipped += 1;
          if incremental {
            consecutive_existing += 1;
            if consecutive_existing >= threshold {
              tracing::info!(
                partition,
                consecutive_existing,
                remaining = edges.len() - index - 1,
                "reached run of stored reports, stopping partition early"
              );
              outcome.early_stop = true;
              break;
            }
          }
        }
        Err(e) => {
          outcome.stats.failed += 1;
          tracing::error!(partition, index, error = %e, "failed to process report");
        }
      }
    }

    outcome
  }

  async fn process_edge(&self, edge: &Value, partition: &str) -> Result<Disposition, RecordError> {
    let node = Edge::deserialize(edge)?.node;

    if !node.is_trusted() {
      tracing::trace!(partition, id = %node.id, "skipping report from untrusted reporter");
      return Ok(Disposition::Untrusted);
    }

    let exists = self
      .store
      .report_exists(&node.id)
      .await
      .map_err(|e| RecordError::Store(Box::new(e)))?;
    if exists {
      return Ok(Disposition::Existing);
    }

    let record = node.into_record(partition, &self.config.provenance_tag);
    let id = record.report.id.clone();
    let written = self
      .store
      .write_report(record, self.config.write_strategy)
      .await
      .map_err(|e| RecordError::Store(Box::new(e)))?;

    if !written.report_inserted {
      // Stored between the existence check and the insert.
      return Ok(Disposition::Existing);
    }
    tracing::debug!(partition, %id, addresses = written.addresses_written, "stored report");
    Ok(Disposition::Accepted { addresses: written.addresses_written as u64 })
  }
}
