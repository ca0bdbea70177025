//! The `RecordStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `abuse-store-sqlite`).
//! The crawler depends on this abstraction, not on any concrete backend.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::report::ReportRecord;

// ─── Write policy ────────────────────────────────────────────────────────────

/// How the statements for one [`ReportRecord`] are committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteStrategy {
  /// Report, addresses and registry rows commit together or not at all.
  #[default]
  Transactional,
  /// Every statement commits on its own. A crash mid-record can leave a
  /// report without its address rows.
  Independent,
}

/// What a [`RecordStore::write_report`] call actually changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOutcome {
  /// `false` when a report with the same id already existed.
  pub report_inserted:    bool,
  /// Address rows offered to the store (conflicting ids included).
  pub addresses_written:  usize,
  /// Address rows that were new.
  pub addresses_inserted: usize,
  /// Registry entries that were new.
  pub unified_inserted:   usize,
}

/// Row counts of the three relations; used for reporting and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TableCounts {
  pub reports:           u64,
  pub report_addresses:  u64,
  pub unified_addresses: u64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the relations the crawler writes to.
///
/// Every write is idempotent: reports are insert-if-absent, report addresses
/// ignore duplicate ids, and the unified registry keeps the first row written
/// for each address string.
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Whether a report with this upstream id has already been stored.
  fn report_exists<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Write one accepted report together with its addresses and registry
  /// entries, committed according to `strategy`.
  fn write_report(
    &self,
    record: ReportRecord,
    strategy: WriteStrategy,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + '_;

  /// Delete every report and report address. The unified registry is kept.
  fn clear_reports(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Row counts of the three relations, logged at the end of a run.
  fn counts(&self) -> impl Future<Output = Result<TableCounts, Self::Error>> + Send + '_;
}
