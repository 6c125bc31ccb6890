//! Options for the `sync` command.

pub mod duration;

pub use duration::{parse_duration, parse_duration_to_secs};

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

pub const DEFAULT_CHECKPOINT_DIR: &str = ".stripe-sync-checkpoints";

/// How a sync session runs and where it keeps its state.
#[derive(Args, Debug, Clone)]
pub struct RunOpts {
    /// Start from this position token instead of the stored checkpoint
    #[arg(long)]
    pub position: Option<String>,

    /// Directory to read and write checkpoint files
    #[arg(long, default_value = DEFAULT_CHECKPOINT_DIR)]
    pub checkpoint_dir: PathBuf,

    /// Write records to this file instead of stdout
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Store the position after this many records
    #[arg(long, default_value = "1")]
    pub checkpoint_every: u64,

    /// Maximum time to run (e.g. "300", "30m", "2h"); runs until interrupted if unset
    #[arg(long)]
    pub timeout: Option<String>,

    /// Stop after emitting this many records
    #[arg(long)]
    pub max_records: Option<u64>,

    /// Wait between event polls that returned nothing
    #[arg(long, default_value = "5s")]
    pub poll_interval: String,
}

impl Default for RunOpts {
    fn default() -> Self {
        Self {
            position: None,
            checkpoint_dir: PathBuf::from(DEFAULT_CHECKPOINT_DIR),
            output: None,
            checkpoint_every: 1,
            timeout: None,
            max_records: None,
            poll_interval: "5s".to_string(),
        }
    }
}

impl RunOpts {
    pub fn poll_interval(&self) -> anyhow::Result<std::time::Duration> {
        let interval = parse_duration(&self.poll_interval)
            .with_context(|| format!("Invalid poll interval: {}", self.poll_interval))?;
        if interval.is_zero() {
            anyhow::bail!("Poll interval must be at least one second");
        }
        Ok(interval)
    }

    pub fn timeout(&self) -> anyhow::Result<Option<std::time::Duration>> {
        self.timeout
            .as_deref()
            .map(|t| parse_duration(t).with_context(|| format!("Invalid timeout format: {t}")))
            .transpose()
    }

    pub fn limits(&self) -> anyhow::Result<RunLimits> {
        if self.checkpoint_every == 0 {
            anyhow::bail!("--checkpoint-every must be at least 1");
        }
        Ok(RunLimits {
            timeout: self.timeout()?,
            max_records: self.max_records,
            checkpoint_every: self.checkpoint_every,
        })
    }
}

/// When a session stops and how often it checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    pub timeout: Option<std::time::Duration>,
    pub max_records: Option<u64>,
    pub checkpoint_every: u64,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            timeout: None,
            max_records: None,
            checkpoint_every: 1,
        }
    }
}
