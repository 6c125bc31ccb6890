//! Generic sync manager for checkpoint operations.

use anyhow::Result;
use async_trait::async_trait;

use crate::{
    store::CheckpointStore, Checkpoint, CheckpointFile, CheckpointID, StoredCheckpoint,
};

/// Manager for handling sync operations with checkpoint tracking.
///
/// The `SyncManager` is generic over its storage backend, so the same
/// source code works with a real store or with `NullStore` when
/// checkpointing is disabled.
///
/// # Example
///
/// ```rust,ignore
/// use checkpoint::{FilesystemStore, SyncManager};
///
/// let manager = SyncManager::new(FilesystemStore::new("/tmp/checkpoints"));
///
/// // Save a checkpoint
/// manager.save_checkpoint("plan", &position).await?;
///
/// // Load a checkpoint
/// let loaded: Option<Position> = manager.read_checkpoint("plan").await?;
/// ```
pub struct SyncManager<S: CheckpointStore> {
    store: S,
}

/// Sync manager that never persists anything.
pub type NullSyncManager = SyncManager<NullStore>;

impl<S: CheckpointStore> SyncManager<S> {
    /// Create a new sync manager over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Get a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Save a checkpoint for a stream, replacing the previous one.
    ///
    /// This is a **SAVING** operation.
    pub async fn save_checkpoint<C: Checkpoint>(&self, stream: &str, checkpoint: &C) -> Result<()> {
        let id = CheckpointID::new(C::SOURCE_TYPE, stream);
        let checkpoint_data = serde_json::to_string(checkpoint)?;
        self.store.store_checkpoint(&id, checkpoint_data).await?;

        tracing::debug!(
            "Saved {} checkpoint for '{}': {}",
            C::SOURCE_TYPE,
            stream,
            checkpoint.to_cli_string()
        );

        Ok(())
    }

    /// Read the stored checkpoint file for a stream, if any.
    pub async fn read_checkpoint_file<C: Checkpoint>(
        &self,
        stream: &str,
    ) -> Result<Option<CheckpointFile>> {
        let id = CheckpointID::new(C::SOURCE_TYPE, stream);
        match self.store.read_checkpoint(&id).await? {
            Some(stored) => Ok(Some(stored.into_file()?)),
            None => Ok(None),
        }
    }

    /// Read and parse the checkpoint for a stream into a source-specific type.
    ///
    /// This is a **LOADING** operation.
    ///
    /// # Type Inference
    ///
    /// ```rust,ignore
    /// let position: Option<Position> = manager.read_checkpoint("plan").await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the stored checkpoint can't be read or its
    /// source type doesn't match `C::SOURCE_TYPE`.
    pub async fn read_checkpoint<C: Checkpoint>(&self, stream: &str) -> Result<Option<C>> {
        match self.read_checkpoint_file::<C>(stream).await? {
            Some(file) => Ok(Some(file.parse::<C>()?)),
            None => Ok(None),
        }
    }
}

/// Store used when checkpointing is disabled.
pub struct NullStore;

#[async_trait]
impl CheckpointStore for NullStore {
    async fn store_checkpoint(&self, _id: &CheckpointID, _checkpoint_data: String) -> Result<()> {
        Ok(())
    }

    async fn read_checkpoint(&self, _id: &CheckpointID) -> Result<Option<StoredCheckpoint>> {
        Ok(None)
    }
}
