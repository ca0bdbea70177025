use std::{
  fs::{File, OpenOptions},
  path::Path,
  sync::Mutex,
};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber: stderr always, plus a plain-text copy
/// appended to `log_file` when given.
///
/// `RUST_LOG` takes precedence over `level`.
pub fn init(level: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
  let filter = EnvFilter::builder()
    .with_default_directive(default_level(level).into())
    .from_env_lossy();

  let file_layer = match log_file {
    Some(path) => Some(
      fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(open_append(path)?)),
    ),
    None => None,
  };

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(file_layer)
    .try_init()?;
  Ok(())
}

/// Unrecognised levels fall back to `info`.
fn default_level(level: &str) -> LevelFilter {
  level.trim().parse().unwrap_or(LevelFilter::INFO)
}

fn open_append(path: &Path) -> std::io::Result<File> {
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)?;
  }
  OpenOptions::new().create(true).append(true).open(path)
}
