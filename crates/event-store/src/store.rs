use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{AggregateId, EventQuery, EventRecord, PendingEvent, Result, Version};

/// A stream of stored records.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventRecord>> + Send>>;

/// Core trait for event store implementations.
///
/// All implementations must be thread-safe (Send + Sync) and must make
/// `append` atomic with respect to its version check: of several concurrent
/// appenders presenting the same `expected_version` for one stream, exactly
/// one wins.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends `events` to the stream of `aggregate_id`.
    ///
    /// Fails with `ConcurrencyConflict` and writes nothing unless the
    /// stream's current version equals `expected_version`. On success the
    /// events get versions `expected_version + 1 ..= expected_version + n`
    /// in order and the stored records are returned. An empty `events` is a
    /// no-op that performs no check and no write.
    async fn append(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        events: Vec<PendingEvent>,
        expected_version: Version,
    ) -> Result<Vec<EventRecord>>;

    /// Retrieves the full stream, oldest first. Empty if the id has no history.
    async fn load(&self, aggregate_id: AggregateId) -> Result<Vec<EventRecord>>;

    /// Retrieves the records with a version strictly greater than `from_version`.
    async fn load_from(
        &self,
        aggregate_id: AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventRecord>>;

    /// Every record in the store ordered by storage time.
    async fn list_all(&self) -> Result<Vec<EventRecord>>;

    /// Retrieves records matching a query, ordered by storage time.
    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventRecord>>;

    /// Streams every record in storage order.
    async fn stream_all_events(&self) -> Result<EventStream>;

    /// Version of the last event in the stream, `Version::initial()` if none.
    async fn current_version(&self, aggregate_id: AggregateId) -> Result<Version>;
}

/// Extension trait providing convenience methods for event stores.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Checks if an aggregate has any events.
    async fn aggregate_exists(&self, aggregate_id: AggregateId) -> Result<bool> {
        Ok(self.current_version(aggregate_id).await? > Version::initial())
    }
}

// Blanket implementation for all EventStore implementations
impl<T: EventStore + ?Sized> EventStoreExt for T {}
