//! Polling of the `/v1/events` feed.
//!
//! Stripe lists events newest first. Every fetched batch is reversed so
//! records leave the iterator oldest first:
//!
//! * With no cursor, all pages since the watermark are collected with
//!   `starting_after` (walking back in time) and the whole backlog is
//!   reversed once.
//! * With a cursor, `ending_before = cursor` returns the events immediately
//!   newer than the cursor. That page is reversed; when draining is enabled
//!   further pages are requested with `ending_before` set to the newest event
//!   seen so far.
//!
//! The position cursor only moves once a batch has been fully emitted, so
//! `(cursor, index)` always identifies the same event after a restart.

use tracing::debug;

use crate::error::Result;
use crate::poll::PollTimer;
use crate::position::Position;
use crate::record::{ChangeOp, ChangeRecord, Next, RecordKey};
use crate::remote::{ChangeEvent, EventCursor, RemoteDataSource};
use crate::resources::EventClassifier;

#[derive(Debug)]
pub(crate) struct IncrementalIterator {
    /// Current batch in ascending creation order.
    batch: Vec<ChangeEvent>,
    fetched: bool,
    last_poll_empty: bool,
    drain_backward_pages: bool,
}

impl IncrementalIterator {
    pub(crate) fn new(drain_backward_pages: bool) -> Self {
        Self {
            batch: Vec::new(),
            fetched: false,
            last_poll_empty: false,
            drain_backward_pages,
        }
    }

    pub(crate) async fn next<S, T>(
        &mut self,
        source: &S,
        position: &mut Position,
        classifier: &EventClassifier,
        timer: &mut T,
    ) -> Result<Next>
    where
        S: RemoteDataSource + ?Sized,
        T: PollTimer + ?Sized,
    {
        if !self.fetched || position.index == 0 {
            if self.last_poll_empty {
                timer.wait().await;
            }

            loop {
                let batch = self.fetch(source, position).await?;
                self.batch = batch;
                self.fetched = true;
                self.last_poll_empty = self.batch.is_empty();

                if position.index < self.batch.len() {
                    break;
                }

                // A restored index can point past the refetched batch when it
                // was written right before the batch was finished.
                match self.batch.last() {
                    Some(newest) => {
                        debug!(
                            "Resume index {} past batch of {}, continuing after {}",
                            position.index,
                            self.batch.len(),
                            newest.id
                        );
                        position.cursor = newest.id.clone();
                        position.index = 0;
                    }
                    None => {
                        position.index = 0;
                        return Ok(Next::RetryLater);
                    }
                }
            }
        }

        let event = &self.batch[position.index];
        let op = classifier.classify(&event.event_type)?;
        let id = event.object_id()?.to_string();
        let payload = match op {
            ChangeOp::Delete => None,
            _ => Some(event.payload()?),
        };
        let timestamp = event.created;

        position.index += 1;
        if position.index == self.batch.len() {
            position.index = 0;
            position.cursor = event.id.clone();
        }

        Ok(Next::Record(ChangeRecord {
            position: position.clone(),
            op,
            key: RecordKey { id },
            payload,
            timestamp,
            resource: classifier.resource().name.to_string(),
        }))
    }

    async fn fetch<S: RemoteDataSource + ?Sized>(
        &self,
        source: &S,
        position: &Position,
    ) -> Result<Vec<ChangeEvent>> {
        if position.cursor.is_empty() {
            self.fetch_backlog(source, position.watermark).await
        } else {
            self.fetch_newer(source, position.watermark, &position.cursor)
                .await
        }
    }

    async fn fetch_backlog<S: RemoteDataSource + ?Sized>(
        &self,
        source: &S,
        watermark: i64,
    ) -> Result<Vec<ChangeEvent>> {
        let mut events = Vec::new();
        let mut cursor = EventCursor::Latest;

        loop {
            let page = source.fetch_event_page(watermark, &cursor).await?;
            debug!(
                "Fetched {} events since {} with {:?} (has_more: {})",
                page.data.len(),
                watermark,
                cursor,
                page.has_more
            );

            let has_more = page.has_more;
            if let Some(oldest) = page.data.last() {
                cursor = EventCursor::StartingAfter(oldest.id.clone());
            }
            let empty = page.data.is_empty();
            events.extend(page.data);

            if !has_more || empty {
                break;
            }
        }

        events.reverse();
        Ok(events)
    }

    async fn fetch_newer<S: RemoteDataSource + ?Sized>(
        &self,
        source: &S,
        watermark: i64,
        after: &str,
    ) -> Result<Vec<ChangeEvent>> {
        let mut events = Vec::new();
        let mut cursor = EventCursor::EndingBefore(after.to_string());

        loop {
            let page = source.fetch_event_page(watermark, &cursor).await?;
            debug!(
                "Fetched {} events with {:?} (has_more: {})",
                page.data.len(),
                cursor,
                page.has_more
            );

            let has_more = page.has_more;
            let mut data = page.data;
            data.reverse();
            if let Some(newest) = data.last() {
                cursor = EventCursor::EndingBefore(newest.id.clone());
            }
            let empty = data.is_empty();
            events.extend(data);

            if !self.drain_backward_pages || !has_more || empty {
                break;
            }
        }

        Ok(events)
    }
}
