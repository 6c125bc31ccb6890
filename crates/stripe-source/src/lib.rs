//! Stripe change capture.
//!
//! This crate turns one Stripe resource (plans, subscriptions, invoices, ...)
//! into an ordered stream of change records:
//!
//! 1. **Snapshot**: every object currently in the resource's list endpoint is
//!    emitted once as a [`ChangeOp::Snapshot`] record.
//! 2. **Incremental**: the `/v1/events` feed is polled from the watermark
//!    fixed when the session started, and each event becomes a create, update
//!    or delete record, oldest first.
//!
//! Each record carries the [`Position`] to resume from, so a restarted
//! session continues right after the last record the caller stored.
//!
//! ```rust,ignore
//! use std::time::Duration;
//!
//! use stripe_sync_source::{
//!     ChangeIterator, IntervalTimer, Next, Position, SourceOpts, StripeClient,
//! };
//!
//! let opts = SourceOpts::new("sk_test_...", "subscription");
//! let client = StripeClient::new(&opts)?;
//! let timer = IntervalTimer::new(Duration::from_secs(5));
//! let mut iter = ChangeIterator::new(client, Position::decode(None)?, opts.iterator_opts()?, timer);
//!
//! loop {
//!     match iter.next().await? {
//!         Next::Record(record) => save(record),
//!         Next::RetryLater => continue,
//!     }
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
mod incremental;
pub mod iterator;
pub mod poll;
pub mod position;
pub mod record;
pub mod remote;
pub mod resources;
mod snapshot;
pub mod testing;

pub use client::StripeClient;
pub use config::SourceOpts;
pub use error::{Error, Result};
pub use iterator::{ChangeIterator, IteratorOpts};
pub use poll::{IntervalTimer, NoDelay, PollTimer};
pub use position::{Mode, Position, PositionError};
pub use record::{ChangeOp, ChangeRecord, Next, RecordKey};
pub use remote::{ChangeEvent, EventCursor, Page, RemoteDataSource, ResourceItem};
pub use resources::{EventClassifier, ResourceSpec};
