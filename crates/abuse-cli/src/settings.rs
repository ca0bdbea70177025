//! Raw settings as read from the TOML file and the environment, and their
//! conversion into the immutable [`RunConfig`].

use std::{path::PathBuf, time::Duration};

use abuse_core::{
  config::{DEFAULT_API_URL, DEFAULT_CHAINS, OrderBy, ParseMode, RunConfig, SortDirection},
  store::WriteStrategy,
};
use serde::Deserialize;

/// Every recognised key, named after its environment variable (lowercased).
/// The same keys may appear at the top level of the TOML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub log_level:                String,
  pub log_file:                 Option<PathBuf>,
  pub db_path:                  PathBuf,
  pub recreate_tables:          bool,

  pub api_url:                  String,
  pub chainabuse_api_token:     String,
  pub chains:                   Vec<String>,
  pub parse_mode:               String,
  pub order_by_field:           Option<String>,
  pub order_by_direction:       Option<String>,
  pub page_size:                u32,
  pub max_consecutive_existing: u32,
  /// `0` or absent means no cap.
  pub max_pages_per_chain:      Option<u64>,
  pub max_retries:              u32,
  pub request_delay_secs:       f64,
  pub time_budget_secs:         u64,
  pub request_timeout_secs:     u64,
  pub clear_existing_data:      bool,
  pub provenance_tag:           String,
  pub atomic_record_writes:     bool,
  pub checkpoint_dir:           PathBuf,
}

impl Default for Settings {
  fn default() -> Self {
    let run = RunConfig::default();
    Self {
      log_level:                "info".to_owned(),
      log_file:                 None,
      db_path:                  PathBuf::from("data/chainabuse.db"),
      recreate_tables:          false,
      api_url:                  DEFAULT_API_URL.to_owned(),
      chainabuse_api_token:     String::new(),
      chains:                   DEFAULT_CHAINS.iter().map(|c| (*c).to_owned()).collect(),
      parse_mode:               ParseMode::default().to_string(),
      order_by_field:           None,
      order_by_direction:       None,
      page_size:                run.page_size,
      max_consecutive_existing: run.max_consecutive_existing,
      max_pages_per_chain:      None,
      max_retries:              run.max_retries,
      request_delay_secs:       run.request_delay.as_secs_f64(),
      time_budget_secs:         run.time_budget.as_secs(),
      request_timeout_secs:     run.request_timeout.as_secs(),
      clear_existing_data:      false,
      provenance_tag:           run.provenance_tag,
      atomic_record_writes:     true,
      checkpoint_dir:           run.checkpoint_dir,
    }
  }
}

impl Settings {
  /// Read `file` (if it exists) layered under the process environment.
  pub fn load(file: PathBuf) -> Result<Self, config::ConfigError> {
    Self::from_sources(config::File::from(file).required(false), None)
  }

  /// Build settings from one file source and either the real environment or
  /// an explicit variable map.
  pub fn from_sources<F>(
    file: F,
    env: Option<config::Map<String, String>>,
  ) -> Result<Self, config::ConfigError>
  where
    F: config::Source + Send + Sync + 'static,
  {
    config::Config::builder()
      .add_source(file)
      .add_source(
        config::Environment::default()
          .try_parsing(true)
          .list_separator(",")
          .with_list_parse_key("chains")
          .source(env),
      )
      .build()?
      .try_deserialize()
  }

  /// Validate and convert into the configuration shared by the pipeline.
  pub fn run_config(&self) -> abuse_core::Result<RunConfig> {
    let mode = ParseMode::parse(&self.parse_mode)?;

    let mut order_by = OrderBy::default_for(mode);
    if let Some(field) = self.order_by_field.as_deref().filter(|f| !f.trim().is_empty()) {
      order_by.field = field.trim().to_owned();
    }
    if let Some(direction) = self.order_by_direction.as_deref().filter(|d| !d.trim().is_empty()) {
      order_by.direction = SortDirection::parse(direction)?;
    }

    let request_delay = Duration::try_from_secs_f64(self.request_delay_secs).map_err(|e| {
      abuse_core::Error::InvalidConfig(format!(
        "invalid request delay {} seconds: {e}",
        self.request_delay_secs
      ))
    })?;

    let config = RunConfig {
      api_url: self.api_url.clone(),
      api_token: self.chainabuse_api_token.clone(),
      partitions: self
        .chains
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_owned)
        .collect(),
      mode,
      order_by,
      page_size: self.page_size,
      max_consecutive_existing: self.max_consecutive_existing,
      max_pages_per_partition: self.max_pages_per_chain.filter(|&n| n > 0),
      max_retries: self.max_retries,
      request_delay,
      time_budget: Duration::from_secs(self.time_budget_secs),
      request_timeout: Duration::from_secs(self.request_timeout_secs),
      clear_existing_data: self.clear_existing_data,
      provenance_tag: self.provenance_tag.clone(),
      write_strategy: if self.atomic_record_writes {
        WriteStrategy::Transactional
      } else {
        WriteStrategy::Independent
      },
      checkpoint_dir: self.checkpoint_dir.clone(),
    };
    config.validate()?;
    Ok(config)
  }
}
