//! [`SqliteStore`]: the SQLite implementation of [`RecordStore`].

use std::path::Path;

use abuse_core::{
  report::{Report, ReportAddress, ReportRecord, UnifiedAddress},
  store::{RecordStore, TableCounts, WriteOutcome, WriteStrategy},
};
use rusqlite::OptionalExtension as _;

use crate::{
  Result,
  encode::{RawUnifiedAddress, REPORT_COLUMNS, address_from_row, report_from_row},
  schema::{DROP_SCHEMA, SCHEMA},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// The crawler's record store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mainly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Drop all three relations and provision them again from scratch.
  pub async fn recreate_schema(&self) -> Result<()> {
    tracing::info!("recreating database tables");
    self
      .conn
      .call(|conn| {
        conn.execute_batch(DROP_SCHEMA)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Statements ──────────────────────────────────────────────────────────────

/// Apply every statement of one record against `conn`.
///
/// Runs inside a transaction or in autocommit mode depending on the caller;
/// the conflict handling is the same either way.
fn apply_record(
  conn: &rusqlite::Connection,
  record: &ReportRecord,
) -> rusqlite::Result<WriteOutcome> {
  let r = &record.report;
  let inserted = conn.execute(
    &format!(
      "INSERT INTO reports ({REPORT_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
       ON CONFLICT (id) DO NOTHING"
    ),
    rusqlite::params![
      r.id,
      r.is_private,
      r.created_at,
      r.scam_category,
      r.category_description,
      r.vote_count,
      r.viewer_did_vote,
      r.description,
      r.comments_count,
      r.source,
      r.checked,
      r.reporter_id,
      r.reporter_username,
      r.reporter_trusted,
      r.partition,
    ],
  )?;

  let mut outcome = WriteOutcome { report_inserted: inserted > 0, ..WriteOutcome::default() };

  for addr in &record.addresses {
    outcome.addresses_inserted += conn.execute(
      "INSERT INTO report_addresses (id, report_id, address, chain)
       VALUES (?1, ?2, ?3, ?4)
       ON CONFLICT (id) DO NOTHING",
      rusqlite::params![addr.id, addr.report_id, addr.address, addr.chain],
    )?;
    outcome.addresses_written += 1;
  }

  for entry in &record.unified {
    outcome.unified_inserted += conn.execute(
      "INSERT INTO unified_addresses (address, type, address_name, source)
       VALUES (?1, ?2, ?3, ?4)
       ON CONFLICT (address) DO NOTHING",
      rusqlite::params![entry.address, entry.kind, entry.address_name, entry.source],
    )?;
  }

  Ok(outcome)
}

fn count(conn: &rusqlite::Connection, table: &str) -> rusqlite::Result<u64> {
  let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
  Ok(n as u64)
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// Lookups for inspecting what a crawl stored; the pipeline itself only
/// needs the [`RecordStore`] surface.
impl SqliteStore {
  /// Retrieve a report by upstream id.
  pub async fn get_report(&self, id: &str) -> Result<Option<Report>> {
    let id = id.to_owned();
    let report = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1"),
              rusqlite::params![id],
              report_from_row,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(report)
  }

  /// All address rows attached to a report, ordered by id.
  pub async fn report_addresses(&self, report_id: &str) -> Result<Vec<ReportAddress>> {
    let report_id = report_id.to_owned();
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, report_id, address, chain FROM report_addresses
           WHERE report_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![report_id], address_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  /// The registry entry for an address string.
  pub async fn get_unified_address(&self, address: &str) -> Result<Option<UnifiedAddress>> {
    let address = address.to_owned();
    let raw: Option<RawUnifiedAddress> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, address, type, address_name, source, created_at
               FROM unified_addresses WHERE address = ?1",
              rusqlite::params![address],
              RawUnifiedAddress::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUnifiedAddress::into_unified).transpose()
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = crate::Error;

  async fn report_exists(&self, id: &str) -> Result<bool> {
    let id = id.to_owned();
    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row("SELECT 1 FROM reports WHERE id = ?1", rusqlite::params![id], |_| Ok(true))
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(exists)
  }

  async fn write_report(
    &self,
    record:   ReportRecord,
    strategy: WriteStrategy,
  ) -> Result<WriteOutcome> {
    let outcome = self
      .conn
      .call(move |conn| match strategy {
        WriteStrategy::Transactional => {
          let tx = conn.transaction()?;
          let outcome = apply_record(&tx, &record)?;
          tx.commit()?;
          Ok(outcome)
        }
        WriteStrategy::Independent => Ok(apply_record(conn, &record)?),
      })
      .await?;
    Ok(outcome)
  }

  async fn clear_reports(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM report_addresses", [])?;
        tx.execute("DELETE FROM reports", [])?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    tracing::info!("cleared existing reports and report addresses");
    Ok(())
  }

  async fn counts(&self) -> Result<TableCounts> {
    let counts = self
      .conn
      .call(|conn| {
        Ok(TableCounts {
          reports:           count(conn, "reports")?,
          report_addresses:  count(conn, "report_addresses")?,
          unified_addresses: count(conn, "unified_addresses")?,
        })
      })
      .await?;
    Ok(counts)
  }
}
