//! In-memory Stripe stand-in for tests.
//!
//! `FakeStripe` paginates the same way the real API does: lists are newest
//! first, `starting_after` walks to older items and `ending_before` returns
//! the items immediately newer than the cursor.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::poll::PollTimer;
use crate::remote::{ChangeEvent, EventCursor, EventData, Page, RemoteDataSource, ResourceItem};

/// A request received by [`FakeStripe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Resources { starting_after: Option<String> },
    Events { watermark: i64, cursor: EventCursor },
}

#[derive(Default)]
struct State {
    /// In list order.
    resources: Vec<ResourceItem>,
    /// Oldest first.
    events: Vec<ChangeEvent>,
    failures: VecDeque<Error>,
    calls: Vec<Call>,
}

pub struct FakeStripe {
    page_size: usize,
    state: Mutex<State>,
}

impl FakeStripe {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not hide the state from others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append an object to the resource list.
    pub fn add_resource(&self, item: ResourceItem) {
        self.state().resources.push(item);
    }

    /// Record an event. Events must be added in creation order.
    pub fn add_event(&self, event: ChangeEvent) {
        self.state().events.push(event);
    }

    /// Make the next request fail with `error`. Queued failures are used
    /// in order.
    pub fn fail_next(&self, error: Error) {
        self.state().failures.push_back(error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    fn page_of<T: Clone>(
        &self,
        newest_first: &[T],
        id_of: impl Fn(&T) -> String,
        starting_after: Option<&str>,
        ending_before: Option<&str>,
    ) -> Result<Page<T>> {
        let find = |id: &str| {
            newest_first
                .iter()
                .position(|item| id_of(item) == id)
                .ok_or_else(|| Error::Api {
                    status: 400,
                    message: format!("No such object: '{id}'"),
                })
        };

        if let Some(id) = ending_before {
            let end = find(id)?;
            let start = end.saturating_sub(self.page_size);
            return Ok(Page::new(newest_first[start..end].to_vec(), start > 0));
        }

        let start = match starting_after {
            Some(id) => find(id)? + 1,
            None => 0,
        };
        let end = (start + self.page_size).min(newest_first.len());
        Ok(Page::new(
            newest_first[start..end].to_vec(),
            end < newest_first.len(),
        ))
    }
}

#[async_trait]
impl RemoteDataSource for FakeStripe {
    async fn fetch_resource_page(
        &self,
        starting_after: Option<&str>,
    ) -> Result<Page<ResourceItem>> {
        let mut state = self.state();
        state.calls.push(Call::Resources {
            starting_after: starting_after.map(str::to_string),
        });
        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }

        let resources = state.resources.clone();
        drop(state);
        self.page_of(
            &resources,
            |item| item.id().map(str::to_string).unwrap_or_default(),
            starting_after,
            None,
        )
    }

    async fn fetch_event_page(
        &self,
        watermark: i64,
        cursor: &EventCursor,
    ) -> Result<Page<ChangeEvent>> {
        let mut state = self.state();
        state.calls.push(Call::Events {
            watermark,
            cursor: cursor.clone(),
        });
        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }

        let newest_first: Vec<ChangeEvent> = state
            .events
            .iter()
            .rev()
            .filter(|e| e.created >= watermark)
            .cloned()
            .collect();
        drop(state);

        let (starting_after, ending_before) = match cursor {
            EventCursor::Latest => (None, None),
            EventCursor::StartingAfter(id) => (Some(id.as_str()), None),
            EventCursor::EndingBefore(id) => (None, Some(id.as_str())),
        };
        self.page_of(
            &newest_first,
            |e| e.id.clone(),
            starting_after,
            ending_before,
        )
    }
}

/// Resource object with an id and creation time.
pub fn item(id: &str, created: i64) -> ResourceItem {
    ResourceItem(json!({"id": id, "object": "test", "created": created}))
}

/// Event about `object_id`.
pub fn event(id: &str, created: i64, event_type: &str, object_id: &str) -> ChangeEvent {
    event_with_object(id, created, event_type, json!({"id": object_id}))
}

pub fn event_with_object(id: &str, created: i64, event_type: &str, object: Value) -> ChangeEvent {
    ChangeEvent {
        id: id.to_string(),
        created,
        event_type: event_type.to_string(),
        data: EventData { object },
    }
}

/// Timer that returns immediately and counts how often it was awaited.
#[derive(Debug, Clone, Default)]
pub struct CountingTimer {
    waits: Arc<AtomicUsize>,
}

impl CountingTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PollTimer for CountingTimer {
    async fn wait(&mut self) {
        self.waits.fetch_add(1, Ordering::SeqCst);
    }
}
