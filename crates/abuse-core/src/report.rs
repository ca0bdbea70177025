//! Report types: the rows the crawler persists.
//!
//! A report is an immutable claim made by an upstream user about one or more
//! addresses. Reports are written at most once and never updated; the
//! addresses they implicate are additionally folded into a cross-source
//! registry of unique address strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification tag written to [`UnifiedAddress::kind`] for every address
/// that comes from an abuse report.
pub const SCAM_ADDRESS_TYPE: &str = "scam";

/// Reporter name used in provenance strings when upstream omits one.
pub const UNKNOWN_REPORTER: &str = "unknown";

// ─── Reports ─────────────────────────────────────────────────────────────────

/// A single abuse report as stored in the `reports` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
  /// Stable upstream identifier; unique across all partitions.
  pub id:                   String,
  pub is_private:           bool,
  /// Upstream timestamp, stored verbatim.
  pub created_at:           String,
  pub scam_category:        String,
  pub category_description: String,
  pub vote_count:           i64,
  pub viewer_did_vote:      Option<bool>,
  pub description:          String,
  pub comments_count:       i64,
  pub source:               String,
  pub checked:              Option<bool>,
  pub reporter_id:          String,
  pub reporter_username:    String,
  pub reporter_trusted:     bool,
  /// The chain this report was fetched under.
  pub partition:            String,
}

/// An address implicated by a report (`report_addresses` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportAddress {
  pub id:        String,
  pub report_id: String,
  pub address:   String,
  pub chain:     String,
}

// ─── Unified registry ────────────────────────────────────────────────────────

/// A candidate row for the `unified_addresses` registry.
///
/// The first writer for a given `address` wins; later inserts are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUnifiedAddress {
  pub address:      String,
  pub kind:         String,
  pub address_name: Option<String>,
  pub source:       Option<String>,
}

impl NewUnifiedAddress {
  /// Build a scam registry entry credited to `reporter` under `provenance`.
  ///
  /// A blank reporter name is recorded as [`UNKNOWN_REPORTER`].
  pub fn scam(
    address: impl Into<String>,
    label: impl Into<String>,
    provenance: &str,
    reporter: &str,
  ) -> Self {
    let reporter = if reporter.trim().is_empty() { UNKNOWN_REPORTER } else { reporter };
    Self {
      address:      address.into(),
      kind:         SCAM_ADDRESS_TYPE.to_owned(),
      address_name: Some(label.into()),
      source:       Some(format!("{provenance} marked by {reporter}")),
    }
  }
}

/// A persisted `unified_addresses` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedAddress {
  /// Surrogate key assigned by the store.
  pub id:           i64,
  pub address:      String,
  pub kind:         String,
  pub address_name: Option<String>,
  pub source:       Option<String>,
  /// Assigned by the store on insert.
  pub created_at:   DateTime<Utc>,
}

// ─── Write unit ──────────────────────────────────────────────────────────────

/// Everything written for one accepted report.
///
/// Stores apply the parts in order: the report, then its addresses, then the
/// registry entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRecord {
  pub report:    Report,
  pub addresses: Vec<ReportAddress>,
  pub unified:   Vec<NewUnifiedAddress>,
}
