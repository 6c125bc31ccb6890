//! Checkpoint file wrapper for storage-agnostic serialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Checkpoint;

/// Storage-agnostic checkpoint file wrapper.
///
/// This struct wraps source-specific checkpoints with metadata
/// for storage and retrieval. The format is designed to be:
/// - Self-describing (includes `source_type` field)
/// - Extensible (uses JSON Value for checkpoint data)
/// - Storage-agnostic (can be saved to local fs, remote storage, etc.)
///
/// # File Format
///
/// ```json
/// {
///     "source_type": "stripe",
///     "stream": "plan",
///     "checkpoint": {
///         "mode": "incremental",
///         "watermark": 1652790765,
///         "cursor": "evt_1652447199",
///         "index": 0
///     },
///     "created_at": "2024-01-01T00:00:00Z"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointFile {
    /// Source type identifier (e.g., "stripe")
    pub source_type: String,
    /// Stream this checkpoint belongs to
    pub stream: String,
    /// Serialized checkpoint data as JSON Value
    pub checkpoint: serde_json::Value,
    /// Timestamp when this checkpoint file was created
    pub created_at: DateTime<Utc>,
}

impl CheckpointFile {
    /// Create new checkpoint file from a source-specific checkpoint.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let position = Position::start(Utc::now().timestamp());
    /// let file = CheckpointFile::new(&position, "plan")?;
    /// ```
    pub fn new<C: Checkpoint>(checkpoint: &C, stream: &str) -> anyhow::Result<Self> {
        Ok(Self {
            source_type: C::SOURCE_TYPE.to_string(),
            stream: stream.to_string(),
            checkpoint: serde_json::to_value(checkpoint)?,
            created_at: Utc::now(),
        })
    }

    /// Parse checkpoint into a source-specific type.
    ///
    /// Validates that the stored `source_type` matches the expected type `C`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The `source_type` doesn't match `C::SOURCE_TYPE`
    /// - The checkpoint data can't be deserialized into type `C`
    pub fn parse<C: Checkpoint>(&self) -> anyhow::Result<C> {
        if self.source_type != C::SOURCE_TYPE {
            anyhow::bail!(
                "Checkpoint type mismatch: expected '{}', found '{}'",
                C::SOURCE_TYPE,
                self.source_type
            );
        }
        Ok(serde_json::from_value(self.checkpoint.clone())?)
    }

    /// Get the source type of this checkpoint file.
    pub fn source_type(&self) -> &str {
        &self.source_type
    }

    /// Get the stream this checkpoint belongs to.
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Get the timestamp when this checkpoint file was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
