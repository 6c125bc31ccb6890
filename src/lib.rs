//! stripe-sync: capture changes of a Stripe resource as a resumable stream
//! of JSON records.
//!
//! The heavy lifting lives in the `stripe-sync-source` crate; this crate
//! wires it to a record sink, a checkpoint store and the command line.

pub mod config;
pub mod sink;
pub mod sync;

pub use config::{RunLimits, RunOpts};
pub use sink::{JsonlSink, RecordSink};
pub use sync::{resolve_start_position, run_sync, StopReason, SyncSummary};
