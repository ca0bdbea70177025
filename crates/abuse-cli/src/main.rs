//! `abuse-crawl`: crawl abuse reports into SQLite.
//!
//! Settings come from `crawler.toml` (or `--config`), overridden by
//! environment variables of the same names in upper case (`PARSE_MODE`,
//! `CHAINS`, `DB_PATH`, ...). Only setup failures make the process exit
//! non-zero; partition failures are logged and summarised.

mod logging;
mod settings;

use std::{path::PathBuf, sync::Arc};

use abuse_crawler::{Orchestrator, checkpoint::FileCheckpointStore, transport::HttpTransport};
use abuse_store_sqlite::SqliteStore;
use anyhow::Context as _;
use clap::Parser;

use crate::settings::Settings;

#[derive(Parser)]
#[command(author, version, about = "Incremental abuse-report crawler")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "crawler.toml")]
  config: PathBuf,

  /// Crawl only this chain. Repeatable; replaces the configured list.
  #[arg(long = "chain", value_name = "CHAIN")]
  chains: Vec<String>,

  /// Start from this cursor instead of the saved checkpoint. Requires
  /// exactly one chain.
  #[arg(long, value_name = "CURSOR")]
  start_cursor: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  let settings = Settings::load(cli.config.clone())
    .with_context(|| format!("failed to read configuration from {:?}", cli.config))?;
  logging::init(&settings.log_level, settings.log_file.as_deref())
    .context("failed to initialise logging")?;

  let mut config = settings.run_config().context("invalid configuration")?;
  if !cli.chains.is_empty() {
    config.partitions = cli.chains.clone();
    config.validate().context("invalid --chain")?;
  }
  if cli.start_cursor.is_some() && config.partitions.len() != 1 {
    anyhow::bail!(
      "--start-cursor needs exactly one chain, {} configured",
      config.partitions.len()
    );
  }
  if config.api_token.is_empty() {
    tracing::warn!("CHAINABUSE_API_TOKEN is not set, requests will be unauthenticated");
  }

  if let Some(parent) = settings.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&settings.db_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.db_path))?;
  if settings.recreate_tables {
    store.recreate_schema().await.context("failed to recreate tables")?;
  }

  let transport = HttpTransport::new(&config.api_url, &config.api_token, config.request_timeout)
    .context("failed to build HTTP client")?;
  let checkpoints = FileCheckpointStore::new(&config.checkpoint_dir);

  tracing::info!(
    db_path = ?settings.db_path,
    checkpoint_dir = ?checkpoints.dir(),
    chains = ?config.partitions,
    "configuration loaded"
  );

  let config = Arc::new(config);
  let start = cli
    .start_cursor
    .as_deref()
    .zip(config.partitions.first())
    .map(|(cursor, partition)| (partition.as_str(), cursor));

  let orchestrator = Orchestrator::new(transport, Arc::new(store), checkpoints, config.clone());
  let stats = orchestrator.run(start).await;

  if stats.partitions_failed > 0 {
    let failed: Vec<&str> = stats
      .partitions
      .iter()
      .filter(|p| !p.succeeded())
      .map(|p| p.partition.as_str())
      .collect();
    tracing::warn!(?failed, "some chains failed; rerun to resume from their checkpoints");
  }

  Ok(())
}
