use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventQuery, EventRecord, EventStoreError, PendingEvent, Result, Version,
    store::{EventStore, EventStream},
};

/// In-memory event store.
///
/// Used by tests and by the server when no database is configured. Records
/// are kept in storage order behind a single lock; `append` holds the write
/// lock from the version check to the insert without yielding, which gives
/// the same all-or-nothing behaviour as the PostgreSQL transaction.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    records: Arc<RwLock<Vec<EventRecord>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of records stored.
    pub async fn event_count(&self) -> usize {
        self.records.read().await.len()
    }

    /// Stores a record as-is, bypassing version assignment.
    ///
    /// Lets tests plant history that could not have been produced by
    /// `append`, such as tags from a retired event variant.
    pub async fn insert_raw(&self, record: EventRecord) {
        self.records.write().await.push(record);
    }

    pub async fn clear(&self) {
        self.records.write().await.clear();
    }

    fn version_of(records: &[EventRecord], aggregate_id: AggregateId) -> Version {
        records
            .iter()
            .filter(|r| r.aggregate_id == aggregate_id)
            .map(|r| r.version)
            .max()
            .unwrap_or(Version::initial())
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        events: Vec<PendingEvent>,
        expected_version: Version,
    ) -> Result<Vec<EventRecord>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let mut store = self.records.write().await;

        let actual = Self::version_of(&store, aggregate_id);
        if actual != expected_version {
            metrics::counter!("event_store_concurrency_conflicts_total").increment(1);
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }

        let created_at = Utc::now();
        let count = events.len();
        let appended: Vec<EventRecord> = events
            .into_iter()
            .enumerate()
            .map(|(offset, event)| {
                event.into_record(
                    aggregate_id,
                    aggregate_type,
                    expected_version.advance(offset + 1),
                    created_at,
                )
            })
            .collect();
        store.extend(appended.iter().cloned());

        metrics::counter!("event_store_appends_total").increment(1);
        metrics::counter!("event_store_events_appended_total").increment(count as u64);
        tracing::debug!(%aggregate_id, aggregate_type, count, "appended events");

        Ok(appended)
    }

    async fn load(&self, aggregate_id: AggregateId) -> Result<Vec<EventRecord>> {
        self.load_from(aggregate_id, Version::initial()).await
    }

    async fn load_from(
        &self,
        aggregate_id: AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventRecord>> {
        let store = self.records.read().await;
        let mut records: Vec<_> = store
            .iter()
            .filter(|r| r.aggregate_id == aggregate_id && r.version > from_version)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.version);
        Ok(records)
    }

    async fn list_all(&self) -> Result<Vec<EventRecord>> {
        let mut records = self.records.read().await.clone();
        // Stable sort keeps insertion order for records stored in one append.
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventRecord>> {
        let mut records: Vec<_> = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);

        let records = records
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(records)
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::stream;

        let records = self.list_all().await?;
        let stream = stream::iter(records.into_iter().map(Ok));
        Ok(Box::pin(stream))
    }

    async fn current_version(&self, aggregate_id: AggregateId) -> Result<Version> {
        let store = self.records.read().await;
        Ok(Self::version_of(&store, aggregate_id))
    }
}
