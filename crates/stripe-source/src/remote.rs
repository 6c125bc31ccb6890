//! Contract between the change iterator and whatever serves Stripe pages.
//!
//! The iterator only ever talks to a [`RemoteDataSource`]. The HTTP client in
//! [`crate::client`] is one implementation; [`crate::testing::FakeStripe`] is
//! another.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// One page of a Stripe list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, has_more: bool) -> Self {
        Self { data, has_more }
    }

    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            has_more: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Pagination marker for the events endpoint.
///
/// Stripe accepts at most one of `starting_after` / `ending_before` per
/// request; `Latest` asks for the newest page without either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventCursor {
    Latest,
    /// Older events than the given id (walks backwards in time).
    StartingAfter(String),
    /// Newer events than the given id (walks forwards in time).
    EndingBefore(String),
}

/// An object from a resource list endpoint, kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceItem(pub Value);

impl ResourceItem {
    pub fn id(&self) -> Result<&str> {
        self.0
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MalformedObject {
                kind: "resource",
                reason: "missing string field \"id\"".to_string(),
            })
    }

    /// Creation time in unix seconds. Some resources (e.g. `account`) have
    /// no `created` field.
    pub fn created(&self) -> Option<i64> {
        self.0.get("created").and_then(Value::as_i64)
    }

    pub fn payload(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.0)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    pub object: Value,
}

/// An entry of the `/v1/events` feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub id: String,
    pub created: i64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

impl ChangeEvent {
    /// Id of the object the event is about.
    pub fn object_id(&self) -> Result<&str> {
        self.data
            .object
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MalformedObject {
                kind: "event",
                reason: format!("event {} has no data.object.id", self.id),
            })
    }

    pub fn payload(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.data.object)?)
    }
}

/// Paginated access to one Stripe resource and its change events.
///
/// Both endpoints return items newest first. Retrying transient failures is
/// the implementor's job; the iterator surfaces every error unchanged.
#[async_trait]
pub trait RemoteDataSource: Send + Sync {
    /// Fetch the page of resource objects that follows `starting_after`
    /// (or the first page when `None`).
    async fn fetch_resource_page(&self, starting_after: Option<&str>)
        -> Result<Page<ResourceItem>>;

    /// Fetch a page of events created at or after `watermark`.
    async fn fetch_event_page(
        &self,
        watermark: i64,
        cursor: &EventCursor,
    ) -> Result<Page<ChangeEvent>>;
}

#[async_trait]
impl<T: RemoteDataSource + ?Sized> RemoteDataSource for Arc<T> {
    async fn fetch_resource_page(
        &self,
        starting_after: Option<&str>,
    ) -> Result<Page<ResourceItem>> {
        (**self).fetch_resource_page(starting_after).await
    }

    async fn fetch_event_page(
        &self,
        watermark: i64,
        cursor: &EventCursor,
    ) -> Result<Page<ChangeEvent>> {
        (**self).fetch_event_page(watermark, cursor).await
    }
}
