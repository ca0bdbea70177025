//! SQL schema for the crawler's SQLite store.
//!
//! Executed once at connection startup. Column names follow the upstream
//! report fields; the partition a report was fetched under lives in `chain`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Reports are insert-if-absent. No UPDATE is ever issued against this table.
CREATE TABLE IF NOT EXISTS reports (
    id                   TEXT PRIMARY KEY,
    is_private           INTEGER NOT NULL DEFAULT 0,
    created_at           TEXT    NOT NULL DEFAULT '',  -- upstream value, verbatim
    scam_category        TEXT    NOT NULL DEFAULT '',
    category_description TEXT    NOT NULL DEFAULT '',
    vote_count           INTEGER NOT NULL DEFAULT 0,
    viewer_did_vote      INTEGER,
    description          TEXT    NOT NULL DEFAULT '',
    comments_count       INTEGER NOT NULL DEFAULT 0,
    source               TEXT    NOT NULL DEFAULT '',
    checked              INTEGER,
    reporter_id          TEXT    NOT NULL DEFAULT '',
    reporter_username    TEXT    NOT NULL DEFAULT '',
    reporter_trusted     INTEGER NOT NULL,
    chain                TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS report_addresses (
    id        TEXT PRIMARY KEY,
    report_id TEXT NOT NULL REFERENCES reports(id),
    address   TEXT NOT NULL,
    chain     TEXT NOT NULL DEFAULT ''
);

-- Cross-source registry: one row per address string, first writer wins.
CREATE TABLE IF NOT EXISTS unified_addresses (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    address      TEXT NOT NULL,
    type         TEXT NOT NULL,
    address_name TEXT,
    labels       TEXT,            -- JSON; populated by other sources
    source       TEXT,
    created_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE UNIQUE INDEX IF NOT EXISTS unified_addresses_address_idx ON unified_addresses(address);
CREATE INDEX IF NOT EXISTS report_addresses_report_idx ON report_addresses(report_id);
CREATE INDEX IF NOT EXISTS reports_chain_idx ON reports(chain);

PRAGMA user_version = 1;
";

/// Drops every table owned by the crawler, children first.
pub const DROP_SCHEMA: &str = "
DROP TABLE IF EXISTS report_addresses;
DROP TABLE IF EXISTS reports;
DROP TABLE IF EXISTS unified_addresses;
PRAGMA user_version = 0;
";
