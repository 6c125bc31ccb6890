//! Filesystem-based checkpoint storage implementation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;

use crate::store::{CheckpointID, CheckpointStore, StoredCheckpoint};

/// Filesystem implementation of CheckpointStore trait.
///
/// Stores one JSON file per checkpoint id in a directory, named
/// `checkpoint_{source}_{stream}.json`. Each save replaces the file through
/// a temporary sibling and a rename, so a crash mid-write leaves the
/// previous checkpoint intact.
pub struct FilesystemStore {
    dir: PathBuf,
}

impl FilesystemStore {
    /// Create a new FilesystemStore with the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the directory path.
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Path of the checkpoint file for an id.
    pub fn path_for(&self, id: &CheckpointID) -> PathBuf {
        self.dir.join(format!("checkpoint_{}.json", id.file_key()))
    }
}

#[async_trait]
impl CheckpointStore for FilesystemStore {
    async fn store_checkpoint(&self, id: &CheckpointID, checkpoint_data: String) -> Result<()> {
        std::fs::create_dir_all(&self.dir).with_context(|| {
            format!(
                "Failed to create checkpoint directory {}",
                self.dir.display()
            )
        })?;

        let stored = StoredCheckpoint {
            checkpoint_data,
            source_type: id.source_type.clone(),
            stream: id.stream.clone(),
            created_at: Utc::now(),
        };

        let filename = self.path_for(id);
        let tmp = filename.with_extension("json.tmp");

        std::fs::write(&tmp, serde_json::to_string_pretty(&stored)?)?;
        std::fs::rename(&tmp, &filename)?;
        tracing::debug!("Stored checkpoint to {}", filename.display());
        Ok(())
    }

    async fn read_checkpoint(&self, id: &CheckpointID) -> Result<Option<StoredCheckpoint>> {
        let filename = self.path_for(id);
        if !filename.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&filename)
            .with_context(|| format!("Failed to read checkpoint {}", filename.display()))?;
        let stored: StoredCheckpoint = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse checkpoint {}", filename.display()))?;

        if stored.source_type != id.source_type || stored.stream != id.stream {
            anyhow::bail!(
                "Checkpoint {} belongs to {}/{}, expected {}/{}",
                filename.display(),
                stored.source_type,
                stored.stream,
                id.source_type,
                id.stream
            );
        }

        Ok(Some(stored))
    }
}
