//! Checkpoint storage trait and types
//!
//! This module defines the CheckpointStore trait for backend-agnostic
//! checkpoint storage operations, plus shared types.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CheckpointFile;

/// Checkpoint identifier for storage
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckpointID {
    /// Source type (e.g., "stripe")
    pub source_type: String,
    /// Stream the checkpoint belongs to (e.g., the resource name "plan")
    pub stream: String,
}

impl CheckpointID {
    pub fn new(source_type: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            source_type: source_type.into(),
            stream: stream.into(),
        }
    }

    /// Filesystem-safe key, e.g. `stripe_billing_portal.configuration`.
    pub fn file_key(&self) -> String {
        let sanitize = |s: &str| -> String {
            s.chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                        c
                    } else {
                        '_'
                    }
                })
                .collect()
        };
        format!("{}_{}", sanitize(&self.source_type), sanitize(&self.stream))
    }
}

/// Checkpoint data stored in backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCheckpoint {
    /// Serialized checkpoint (e.g., the encoded position token)
    pub checkpoint_data: String,
    /// Source type for validation
    pub source_type: String,
    /// Stream for validation
    pub stream: String,
    /// Timestamp when checkpoint was created
    pub created_at: DateTime<Utc>,
}

impl StoredCheckpoint {
    /// Convert into a `CheckpointFile`.
    ///
    /// The `checkpoint_data` field contains the JSON-serialized checkpoint.
    pub fn into_file(self) -> Result<CheckpointFile> {
        let checkpoint: serde_json::Value = serde_json::from_str(&self.checkpoint_data)?;
        Ok(CheckpointFile {
            source_type: self.source_type,
            stream: self.stream,
            checkpoint,
            created_at: self.created_at,
        })
    }
}

/// Trait for checkpoint storage operations.
///
/// This trait abstracts the storage backend for checkpoint operations,
/// allowing the same checkpoint logic to work with:
/// - Filesystem storage (`FilesystemStore`)
/// - No storage at all (`NullStore`)
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Store a checkpoint in the storage backend, replacing any previous
    /// checkpoint with the same id.
    async fn store_checkpoint(&self, id: &CheckpointID, checkpoint_data: String) -> Result<()>;

    /// Read a checkpoint from the storage backend.
    ///
    /// Returns None if the checkpoint doesn't exist.
    async fn read_checkpoint(&self, id: &CheckpointID) -> Result<Option<StoredCheckpoint>>;
}
