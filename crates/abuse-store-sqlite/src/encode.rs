//! Decoding helpers between SQLite rows and the domain types in
//! `abuse_core::report`.
//!
//! Booleans are stored as `INTEGER` 0/1, store-assigned timestamps as
//! RFC 3339 strings. Upstream timestamps are opaque and kept verbatim.

use abuse_core::report::{Report, ReportAddress, UnifiedAddress};
use chrono::{DateTime, Utc};

use crate::{Error, Result};

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const REPORT_COLUMNS: &str = "id, is_private, created_at, scam_category, category_description,
   vote_count, viewer_did_vote, description, comments_count, source, checked,
   reporter_id, reporter_username, reporter_trusted, chain";

/// Map a row selected with [`REPORT_COLUMNS`] into a [`Report`].
pub fn report_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Report> {
  Ok(Report {
    id:                   row.get(0)?,
    is_private:           row.get(1)?,
    created_at:           row.get(2)?,
    scam_category:        row.get(3)?,
    category_description: row.get(4)?,
    vote_count:           row.get(5)?,
    viewer_did_vote:      row.get(6)?,
    description:          row.get(7)?,
    comments_count:       row.get(8)?,
    source:               row.get(9)?,
    checked:              row.get(10)?,
    reporter_id:          row.get(11)?,
    reporter_username:    row.get(12)?,
    reporter_trusted:     row.get(13)?,
    partition:            row.get(14)?,
  })
}

pub fn address_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReportAddress> {
  Ok(ReportAddress {
    id:        row.get(0)?,
    report_id: row.get(1)?,
    address:   row.get(2)?,
    chain:     row.get(3)?,
  })
}

/// Raw values read directly from a `unified_addresses` row.
pub struct RawUnifiedAddress {
  pub id:           i64,
  pub address:      String,
  pub kind:         String,
  pub address_name: Option<String>,
  pub source:       Option<String>,
  pub created_at:   String,
}

impl RawUnifiedAddress {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      address:      row.get(1)?,
      kind:         row.get(2)?,
      address_name: row.get(3)?,
      source:       row.get(4)?,
      created_at:   row.get(5)?,
    })
  }

  pub fn into_unified(self) -> Result<UnifiedAddress> {
    Ok(UnifiedAddress {
      id:           self.id,
      address:      self.address,
      kind:         self.kind,
      address_name: self.address_name,
      source:       self.source,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}
