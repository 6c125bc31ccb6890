//! Full read of a resource collection.

use chrono::Utc;
use tracing::debug;

use crate::error::Result;
use crate::position::Position;
use crate::record::{ChangeOp, ChangeRecord, RecordKey};
use crate::remote::{RemoteDataSource, ResourceItem};

/// Walks the resource list endpoint page by page.
///
/// `position.cursor` holds the id of the last emitted item, so a restart
/// continues with the page after it.
#[derive(Debug, Default)]
pub(crate) struct SnapshotIterator {
    page: Vec<ResourceItem>,
    index: usize,
    fetched: bool,
}

impl SnapshotIterator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Emit the next snapshot record, or `None` once the collection is
    /// exhausted.
    pub(crate) async fn next<S: RemoteDataSource + ?Sized>(
        &mut self,
        source: &S,
        position: &mut Position,
        resource: &str,
    ) -> Result<Option<ChangeRecord>> {
        if !self.fetched || self.index >= self.page.len() {
            let starting_after = (!position.cursor.is_empty()).then_some(position.cursor.as_str());
            let page = source.fetch_resource_page(starting_after).await?;
            debug!(
                "Fetched {} {} objects after {:?} (has_more: {})",
                page.data.len(),
                resource,
                starting_after,
                page.has_more
            );

            self.page = page.data;
            self.index = 0;
            self.fetched = true;

            if self.page.is_empty() {
                return Ok(None);
            }
        }

        let item = &self.page[self.index];
        let id = item.id()?.to_string();
        let payload = item.payload()?;
        let timestamp = item.created().unwrap_or_else(|| Utc::now().timestamp());

        position.cursor = id.clone();
        self.index += 1;

        Ok(Some(ChangeRecord {
            position: position.clone(),
            op: ChangeOp::Snapshot,
            key: RecordKey { id },
            payload: Some(payload),
            timestamp,
            resource: resource.to_string(),
        }))
    }
}
