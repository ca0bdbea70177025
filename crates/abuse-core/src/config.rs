//! The immutable run configuration shared by every pipeline component.
//!
//! Built once at startup (see `abuse-cli`) and passed down by reference; no
//! component mutates it.

use std::{path::PathBuf, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{Error, Result, store::WriteStrategy};

/// Partitions crawled when none are configured.
pub const DEFAULT_CHAINS: &[&str] = &[
  "BTC", "BINANCE", "ETH", "SOL", "TRON", "POLYGON", "LITECOIN", "ARBITRUM",
  "AVALANCHE", "HBAR", "BASE", "CARDANO", "MULTIVERSX", "TON", "ALGORAND",
];

pub const DEFAULT_API_URL: &str = "https://www.chainabuse.com/api/graphql-proxy";

// ─── Enums ───────────────────────────────────────────────────────────────────

/// How existing reports are treated while paginating.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParseMode {
  /// Walk every page; reports already stored are skipped.
  #[default]
  #[strum(to_string = "FULL")]
  Full,
  /// Assume newest-first ordering and stop a partition after a run of
  /// already-stored reports.
  #[strum(to_string = "NEW_ONLY", serialize = "INCREMENTAL")]
  NewOnly,
}

impl ParseMode {
  pub fn parse(s: &str) -> Result<Self> {
    Self::from_str(s.trim()).map_err(|_| Error::UnknownParseMode(s.to_owned()))
  }

  pub fn is_incremental(self) -> bool { matches!(self, Self::NewOnly) }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
  Asc,
  #[default]
  Desc,
}

impl SortDirection {
  pub fn parse(s: &str) -> Result<Self> {
    Self::from_str(s.trim()).map_err(|_| Error::UnknownSortDirection(s.to_owned()))
  }
}

/// Upstream sort key, sent verbatim as `input.orderBy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
  pub field:     String,
  pub direction: SortDirection,
}

impl OrderBy {
  /// Incremental mode relies on newest-first pages; full mode walks by votes.
  pub fn default_for(mode: ParseMode) -> Self {
    let field = match mode {
      ParseMode::Full => "UPVOTES_COUNT",
      ParseMode::NewOnly => "CREATED_AT",
    };
    Self { field: field.to_owned(), direction: SortDirection::Desc }
  }
}

// ─── Run configuration ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RunConfig {
  pub api_url:                  String,
  /// Static bearer credential; never refreshed.
  pub api_token:                String,
  /// Partitions (chains) crawled in order.
  pub partitions:               Vec<String>,
  pub mode:                     ParseMode,
  pub order_by:                 OrderBy,
  /// `first` variable of each request.
  pub page_size:                u32,
  /// Early-stop threshold for [`ParseMode::NewOnly`].
  pub max_consecutive_existing: u32,
  pub max_pages_per_partition:  Option<u64>,
  /// Retries per fetch attempt sequence before the partition is abandoned.
  pub max_retries:              u32,
  /// Pause after every successful request.
  pub request_delay:            Duration,
  /// Wall-clock budget per partition, polled once per page.
  pub time_budget:              Duration,
  pub request_timeout:          Duration,
  /// Truncate reports and report addresses before the first partition.
  pub clear_existing_data:      bool,
  /// Prefix of the `source` column in the unified registry.
  pub provenance_tag:           String,
  pub write_strategy:           WriteStrategy,
  pub checkpoint_dir:           PathBuf,
}

impl Default for RunConfig {
  fn default() -> Self {
    let mode = ParseMode::default();
    Self {
      api_url:                  DEFAULT_API_URL.to_owned(),
      api_token:                String::new(),
      partitions:               DEFAULT_CHAINS.iter().map(|c| (*c).to_owned()).collect(),
      mode,
      order_by:                 OrderBy::default_for(mode),
      page_size:                100,
      max_consecutive_existing: 5,
      max_pages_per_partition:  None,
      max_retries:              5,
      request_delay:            Duration::from_secs(1),
      time_budget:              Duration::from_secs(2 * 60 * 60),
      request_timeout:          Duration::from_secs(30),
      clear_existing_data:      false,
      provenance_tag:           "chainabuse".to_owned(),
      write_strategy:           WriteStrategy::default(),
      checkpoint_dir:           PathBuf::from("data/checkpoints"),
    }
  }
}

impl RunConfig {
  /// Reject configurations the pipeline cannot run with.
  pub fn validate(&self) -> Result<()> {
    if self.partitions.is_empty() {
      return Err(Error::InvalidConfig("no partitions configured".into()));
    }
    if let Some(blank) = self.partitions.iter().find(|p| p.trim().is_empty()) {
      return Err(Error::InvalidConfig(format!("blank partition name {blank:?}")));
    }
    if self.page_size == 0 {
      return Err(Error::InvalidConfig("page size must be positive".into()));
    }
    if self.mode.is_incremental() && self.max_consecutive_existing == 0 {
      return Err(Error::InvalidConfig(
        "max consecutive existing must be positive in NEW_ONLY mode".into(),
      ));
    }
    if self.max_pages_per_partition == Some(0) {
      return Err(Error::InvalidConfig("page cap must be positive when set".into()));
    }
    if self.order_by.field.trim().is_empty() {
      return Err(Error::InvalidConfig("order-by field must not be blank".into()));
    }
    Ok(())
  }
}
