//! Checkpoint management for stripe-sync
//!
//! Provides storage-agnostic persistence of resume positions with support for
//! source-specific checkpoint types.
//!
//! # Architecture
//!
//! This crate provides a generic checkpoint system that:
//! - Defines the `Checkpoint` trait for source-specific checkpoint types
//! - Provides `CheckpointFile` wrapper for storage-agnostic serialization
//! - Manages checkpoint saving/loading via `SyncManager`
//! - Supports multiple storage backends via `CheckpointStore` trait
//!
//! ## Storage Backends
//!
//! - `FilesystemStore` - Stores one JSON file per checkpointed stream
//! - `NullStore` - Discards everything (checkpointing disabled)
//!
//! A checkpoint is keyed by its source type (e.g. `"stripe"`) and a stream
//! name (e.g. the resource being synced), so several streams can share one
//! store without clobbering each other.

mod file;
mod filesystem;
mod manager;
pub mod store;


// Re-export file types
pub use file::CheckpointFile;

// Re-export manager types
pub use manager::{NullStore, NullSyncManager, SyncManager};

// Re-export store trait and types
pub use store::{CheckpointID, CheckpointStore, StoredCheckpoint};

// Re-export storage implementations
pub use filesystem::FilesystemStore;

/// Trait that source-specific checkpoints must implement.
///
/// This trait defines the interface for checkpoint types, enabling
/// storage-agnostic checkpoint file handling while preserving
/// source-specific data structures.
///
/// # Example
///
/// ```rust
/// use checkpoint::Checkpoint;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct OffsetCheckpoint {
///     pub offset: i64,
/// }
///
/// impl Checkpoint for OffsetCheckpoint {
///     const SOURCE_TYPE: &'static str = "offset";
///
///     fn to_cli_string(&self) -> String {
///         self.offset.to_string()
///     }
///
///     fn from_cli_string(s: &str) -> anyhow::Result<Self> {
///         Ok(Self { offset: s.parse()? })
///     }
/// }
/// ```
pub trait Checkpoint: serde::Serialize + for<'de> serde::Deserialize<'de> + Clone {
    /// Source type identifier (e.g., "stripe").
    ///
    /// This constant is used to:
    /// - Identify the checkpoint type in serialized files
    /// - Validate checkpoint type when loading from storage
    const SOURCE_TYPE: &'static str;

    /// Convert to CLI-friendly string format.
    ///
    /// The returned string should be parseable by `from_cli_string()`.
    /// This format is used for:
    /// - Command-line arguments (e.g., `--position`)
    /// - Logging and debugging output
    fn to_cli_string(&self) -> String;

    /// Parse from CLI string format.
    ///
    /// Should parse the format produced by `to_cli_string()`.
    fn from_cli_string(s: &str) -> anyhow::Result<Self>
    where
        Self: Sized;
}

/// Read the checkpoint file stored for a stream in a directory.
///
/// Standalone function that doesn't require a `SyncManager`.
/// Useful for tests and CLI scenarios where you just have a directory path.
///
/// # Errors
/// * Returns error if no checkpoint exists for the stream
/// * Returns error if checkpoint file cannot be read or parsed
///
/// # Example
/// ```ignore
/// let file = read_checkpoint_from_dir(".stripe-sync-checkpoints", "stripe", "plan").await?;
/// let position: Position = file.parse()?;
/// ```
pub async fn read_checkpoint_from_dir<P: AsRef<std::path::Path>>(
    checkpoint_dir: P,
    source_type: &str,
    stream: &str,
) -> anyhow::Result<CheckpointFile> {
    let store = FilesystemStore::new(checkpoint_dir.as_ref());
    let id = CheckpointID::new(source_type, stream);

    let stored = store
        .read_checkpoint(&id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("No checkpoint found for {source_type}/{stream}"))?;

    stored.into_file()
}
