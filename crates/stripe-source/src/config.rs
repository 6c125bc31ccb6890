//! Source options.

use clap::Parser;

use crate::error::{Error, Result};
use crate::iterator::IteratorOpts;
use crate::resources::{self, EventClassifier, ResourceSpec};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com/v1";

/// Largest `--batch-size` accepted.
pub const MAX_BATCH_SIZE: usize = 100_000;

#[derive(Parser, Clone)]
pub struct SourceOpts {
    /// Stripe secret API key
    #[arg(long, env = "STRIPE_SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,

    /// Resource to sync (e.g. "subscription", "checkout.session").
    /// Resources without change events (e.g. "balance_transaction") are
    /// snapshot-only.
    #[arg(long, env = "STRIPE_RESOURCE_NAME")]
    pub resource_name: String,

    /// Objects requested per page
    #[arg(long, default_value = "10")]
    pub batch_size: usize,

    /// Read all existing objects before polling events
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub snapshot: bool,

    /// Retries per request on network errors, 429 and 5xx responses
    #[arg(long, default_value = "3")]
    pub max_retries: u32,

    /// Fail on event types not listed for the resource instead of
    /// classifying them by name
    #[arg(long)]
    pub strict_event_types: bool,

    /// Follow all newer event pages on each poll instead of one page
    #[arg(long)]
    pub drain_backward_pages: bool,

    /// Stripe API base URL
    #[arg(long, default_value = DEFAULT_API_BASE, env = "STRIPE_API_BASE")]
    pub api_base: String,
}

impl std::fmt::Debug for SourceOpts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceOpts")
            .field("secret_key", &"<redacted>")
            .field("resource_name", &self.resource_name)
            .field("batch_size", &self.batch_size)
            .field("snapshot", &self.snapshot)
            .field("max_retries", &self.max_retries)
            .field("strict_event_types", &self.strict_event_types)
            .field("drain_backward_pages", &self.drain_backward_pages)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl SourceOpts {
    /// Options with defaults for everything but the credentials and resource.
    pub fn new(secret_key: impl Into<String>, resource_name: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            resource_name: resource_name.into(),
            batch_size: 10,
            snapshot: true,
            max_retries: 3,
            strict_event_types: false,
            drain_backward_pages: false,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Check every option, reporting all problems at once.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.secret_key.trim().is_empty() {
            problems.push("secret key must not be empty".to_string());
        }
        if resources::lookup(&self.resource_name).is_none() {
            problems.push(format!("unknown resource '{}'", self.resource_name));
        }
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            problems.push(format!(
                "batch size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                self.batch_size
            ));
        }
        if !(self.api_base.starts_with("http://") || self.api_base.starts_with("https://")) {
            problems.push(format!(
                "API base must be an http(s) URL, got '{}'",
                self.api_base
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidConfig(problems.join("; ")))
        }
    }

    pub fn resource(&self) -> Result<&'static ResourceSpec> {
        resources::resolve(&self.resource_name)
    }

    pub fn iterator_opts(&self) -> Result<IteratorOpts> {
        Ok(IteratorOpts {
            snapshot: self.snapshot,
            classifier: EventClassifier::new(self.resource()?, self.strict_event_types),
            drain_backward_pages: self.drain_backward_pages,
        })
    }
}
