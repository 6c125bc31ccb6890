//! Snapshot-then-incremental change iterator.

use futures::Stream;
use tracing::info;

use crate::error::Result;
use crate::incremental::IncrementalIterator;
use crate::poll::PollTimer;
use crate::position::{Mode, Position};
use crate::record::{ChangeRecord, Next};
use crate::remote::RemoteDataSource;
use crate::resources::EventClassifier;
use crate::snapshot::SnapshotIterator;

#[derive(Debug, Clone, Copy)]
pub struct IteratorOpts {
    /// Read the current state of the resource before polling events.
    pub snapshot: bool,
    pub classifier: EventClassifier,
    /// Follow `has_more` on steady-state polls instead of taking one page
    /// per refill.
    pub drain_backward_pages: bool,
}

impl IteratorOpts {
    pub fn new(classifier: EventClassifier) -> Self {
        Self {
            snapshot: true,
            classifier,
            drain_backward_pages: false,
        }
    }
}

/// Emits every object of a resource once, then its change events forever.
///
/// The iterator owns the [`Position`]; the copy attached to each record is
/// what a caller persists to resume later.
///
/// `timer` gates re-polling after an empty event poll. Use
/// [`IntervalTimer`](crate::poll::IntervalTimer) against the real API;
/// [`NoDelay`](crate::poll::NoDelay) polls again immediately and is meant for
/// tests and one-shot runs that stop at the first `RetryLater`.
pub struct ChangeIterator<S, T> {
    source: S,
    position: Position,
    classifier: EventClassifier,
    snapshot: SnapshotIterator,
    incremental: IncrementalIterator,
    timer: T,
    /// Set once the "no change events" notice for the resource was logged.
    events_unavailable_reported: bool,
}

impl<S: RemoteDataSource, T: PollTimer> ChangeIterator<S, T> {
    pub fn new(source: S, mut position: Position, opts: IteratorOpts, timer: T) -> Self {
        if !opts.snapshot && position.mode == Mode::Snapshot {
            info!(
                "Snapshot disabled for '{}', polling events from {}",
                opts.classifier.resource().name,
                position.watermark
            );
            position.enter_incremental();
        }

        Self {
            source,
            position,
            classifier: opts.classifier,
            snapshot: SnapshotIterator::new(),
            incremental: IncrementalIterator::new(opts.drain_backward_pages),
            timer,
            events_unavailable_reported: false,
        }
    }

    /// Replace the timer used between empty incremental polls.
    pub fn with_timer<U: PollTimer>(self, timer: U) -> ChangeIterator<S, U> {
        ChangeIterator {
            source: self.source,
            position: self.position,
            classifier: self.classifier,
            snapshot: self.snapshot,
            incremental: self.incremental,
            timer,
            events_unavailable_reported: self.events_unavailable_reported,
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Produce the next record.
    ///
    /// Errors from the remote source are returned as is and leave the
    /// position where it was, so calling again retries the same step.
    pub async fn next(&mut self) -> Result<Next> {
        let resource = self.classifier.resource().name;

        match self.position.mode {
            Mode::Snapshot => {
                if let Some(record) = self
                    .snapshot
                    .next(&self.source, &mut self.position, resource)
                    .await?
                {
                    return Ok(Next::Record(record));
                }

                info!(
                    "Snapshot of '{}' complete, switching to incremental sync from {}",
                    resource, self.position.watermark
                );
                self.position.enter_incremental();
                self.poll_events().await
            }
            Mode::Incremental => self.poll_events().await,
        }
    }

    async fn poll_events(&mut self) -> Result<Next> {
        let resource = self.classifier.resource();

        // Without an event table the events query has no type filter and
        // would match every event of the account.
        if resource.events.is_empty() {
            if self.events_unavailable_reported {
                self.timer.wait().await;
            } else {
                info!(
                    "'{}' has no change events, nothing to poll after the snapshot",
                    resource.name
                );
                self.events_unavailable_reported = true;
            }
            return Ok(Next::RetryLater);
        }

        self.incremental
            .next(
                &self.source,
                &mut self.position,
                &self.classifier,
                &mut self.timer,
            )
            .await
    }

    /// Adapt into a stream of records. `RetryLater` results are absorbed,
    /// with the iterator's timer pacing the next poll, and the stream ends
    /// after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<ChangeRecord>> + Send
    where
        S: 'static,
        T: 'static,
    {
        futures::stream::unfold(Some(self), |state| async move {
            let mut iter = state?;
            loop {
                match iter.next().await {
                    Ok(Next::Record(record)) => return Some((Ok(record), Some(iter))),
                    Ok(Next::RetryLater) => tokio::task::yield_now().await,
                    Err(e) => return Some((Err(e), None)),
                }
            }
        })
    }
}
