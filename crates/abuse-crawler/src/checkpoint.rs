//! [`FileCheckpointStore`]: one JSON file per partition.

use std::{
  io::ErrorKind,
  path::{Path, PathBuf},
};

use abuse_core::checkpoint::{Checkpoint, CheckpointStore};

use crate::CheckpointError;

/// Stores checkpoints as `<dir>/<partition>.json`.
///
/// Files are replaced atomically (write to a sibling `.tmp`, then rename),
/// so a crash mid-save leaves the previous checkpoint intact.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
  dir: PathBuf,
}

impl FileCheckpointStore {
  pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

  pub fn dir(&self) -> &Path { &self.dir }

  fn path_for(&self, partition: &str) -> PathBuf {
    let name: String = partition
      .chars()
      .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
      .collect();
    self.dir.join(format!("{name}.json"))
  }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
  if let Some(parent) = path.parent() {
    tokio::fs::create_dir_all(parent).await?;
  }
  let tmp = path.with_extension("json.tmp");
  tokio::fs::write(&tmp, bytes).await?;
  tokio::fs::rename(&tmp, path).await
}

impl CheckpointStore for FileCheckpointStore {
  type Error = CheckpointError;

  async fn load(&self, partition: &str) -> Result<Option<Checkpoint>, CheckpointError> {
    let bytes = match tokio::fs::read(self.path_for(partition)).await {
      Ok(bytes) => bytes,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
  }

  async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
    let bytes = serde_json::to_vec_pretty(checkpoint)?;
    write_atomic(&self.path_for(&checkpoint.partition), &bytes).await?;
    Ok(())
  }
}
