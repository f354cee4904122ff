//! Projection processor for feeding events to projections.

use event_store::{EventRecord, EventStore};
use futures_util::StreamExt;
use tokio::sync::{Mutex, RwLock};

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};

/// A registered projection and the records it has applied.
struct Registered {
    projection: Box<dyn Projection>,
    position: RwLock<ProjectionPosition>,
}

/// Delivers stored records to projections.
///
/// The processor supports:
/// - Publish: hands freshly appended records to every projection, in order
/// - Catch-up: replays the log to bring projections up to date
/// - Rebuild: resets all projections and replays from scratch
///
/// Deliveries are serialized, so a catch-up never interleaves with a publish.
/// Each projection sees a given record at most once, whichever path delivers
/// it first.
pub struct ProjectionProcessor<S: EventStore> {
    store: S,
    projections: Vec<Registered>,
    delivery: Mutex<()>,
}

impl<S: EventStore> ProjectionProcessor<S> {
    /// Creates a new processor with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
            delivery: Mutex::new(()),
        }
    }

    /// Registers a projection with this processor.
    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(Registered {
            projection,
            position: RwLock::new(ProjectionPosition::zero()),
        });
    }

    /// Returns the number of registered projections.
    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// Name and applied-record count of every registered projection.
    pub async fn positions(&self) -> Vec<(&'static str, u64)> {
        let mut positions = Vec::with_capacity(self.projections.len());
        for registered in &self.projections {
            let applied = registered.position.read().await.events_processed();
            positions.push((registered.projection.name(), applied));
        }
        positions
    }

    /// Delivers records that were just appended, in order, to every projection.
    ///
    /// Stops at the first failing projection. Records already appended stay
    /// durable; the read models pick them up on the next catch-up.
    #[tracing::instrument(skip(self, records), fields(count = records.len()))]
    pub async fn publish(&self, records: &[EventRecord]) -> Result<()> {
        let _guard = self.delivery.lock().await;
        for record in records {
            for registered in &self.projections {
                Self::apply(registered, record).await?;
            }
        }
        Ok(())
    }

    /// Runs catch-up processing: streams all events from the store and delivers
    /// each one to every projection that hasn't already applied it.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<()> {
        let _guard = self.delivery.lock().await;
        self.catch_up().await
    }

    /// Resets all projections and replays all events from the store.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<()> {
        let _guard = self.delivery.lock().await;
        for registered in &self.projections {
            registered.projection.reset().await?;
            *registered.position.write().await = ProjectionPosition::zero();
        }
        self.catch_up().await
    }

    /// Hands the record to one projection unless it was applied before.
    /// Returns whether the projection handled it.
    async fn apply(registered: &Registered, record: &EventRecord) -> Result<bool> {
        let mut position = registered.position.write().await;
        if position.contains(record.record_id) {
            return Ok(false);
        }

        registered.projection.handle(record).await?;
        position.advance(record.record_id);
        metrics::counter!("projections_events_processed").increment(1);
        Ok(true)
    }

    async fn catch_up(&self) -> Result<()> {
        let mut stream = self.store.stream_all_events().await?;
        let mut scanned: u64 = 0;
        let mut delivered: u64 = 0;

        while let Some(result) = stream.next().await {
            let record = result?;
            scanned += 1;

            for registered in &self.projections {
                if Self::apply(registered, &record).await? {
                    delivered += 1;
                }
            }
        }

        tracing::info!(events_scanned = scanned, delivered, "catch-up complete");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use event_store::{AggregateId, EventId, InMemoryEventStore, PendingEvent, Version};
    use std::sync::Arc;

    /// A simple counting projection for testing.
    struct CountingProjection {
        count: Arc<RwLock<u64>>,
    }

    impl CountingProjection {
        fn new() -> Self {
            Self {
                count: Arc::new(RwLock::new(0)),
            }
        }
    }

    #[async_trait]
    impl Projection for CountingProjection {
        fn name(&self) -> &'static str {
            "CountingProjection"
        }

        async fn handle(&self, _record: &EventRecord) -> Result<()> {
            let mut count = self.count.write().await;
            *count += 1;
            Ok(())
        }

        async fn reset(&self) -> Result<()> {
            *self.count.write().await = 0;
            Ok(())
        }
    }

    fn pending(n: usize) -> Vec<PendingEvent> {
        (0..n)
            .map(|i| {
                PendingEvent::new(
                    EventId::new(),
                    "TestEvent",
                    Utc::now(),
                    serde_json::json!({ "n": i }),
                )
            })
            .collect()
    }

    async fn seeded_store(n: usize) -> InMemoryEventStore {
        let store = InMemoryEventStore::new();
        store
            .append(AggregateId::new(), "Test", pending(n), Version::initial())
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_catch_up_processes_all_events() {
        let store = seeded_store(3).await;

        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);
        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(projection));

        processor.run_catch_up().await.unwrap();

        assert_eq!(*count_ref.read().await, 3);
    }

    #[tokio::test]
    async fn test_publish_delivers_in_order() {
        let store = InMemoryEventStore::new();
        let records = store
            .append(AggregateId::new(), "Test", pending(2), Version::initial())
            .await
            .unwrap();

        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);
        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(projection));

        processor.publish(&records).await.unwrap();
        assert_eq!(*count_ref.read().await, 2);

        // Already published, so catch-up has nothing left to deliver.
        processor.run_catch_up().await.unwrap();
        assert_eq!(*count_ref.read().await, 2);
    }

    #[tokio::test]
    async fn test_publish_nothing() {
        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);
        let mut processor = ProjectionProcessor::new(InMemoryEventStore::new());
        processor.register(Box::new(projection));

        processor.publish(&[]).await.unwrap();
        assert_eq!(*count_ref.read().await, 0);
    }

    #[tokio::test]
    async fn test_rebuild_resets_and_replays() {
        let store = seeded_store(2).await;

        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);

        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(projection));

        processor.run_catch_up().await.unwrap();
        assert_eq!(*count_ref.read().await, 2);

        processor.rebuild_all().await.unwrap();
        assert_eq!(*count_ref.read().await, 2);
        assert_eq!(processor.positions().await, vec![("CountingProjection", 2)]);
    }

    #[tokio::test]
    async fn test_catch_up_skips_already_processed() {
        let store = seeded_store(3).await;

        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);

        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(projection));

        processor.run_catch_up().await.unwrap();
        assert_eq!(*count_ref.read().await, 3);

        processor.run_catch_up().await.unwrap();
        assert_eq!(*count_ref.read().await, 3);
    }

    #[tokio::test]
    async fn test_empty_store_catch_up() {
        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);

        let mut processor = ProjectionProcessor::new(InMemoryEventStore::new());
        processor.register(Box::new(projection));

        processor.run_catch_up().await.unwrap();
        assert_eq!(*count_ref.read().await, 0);
    }

    #[tokio::test]
    async fn test_multiple_projections() {
        let store = seeded_store(2).await;

        let proj1 = CountingProjection::new();
        let proj2 = CountingProjection::new();
        let count1 = Arc::clone(&proj1.count);
        let count2 = Arc::clone(&proj2.count);

        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(proj1));
        processor.register(Box::new(proj2));
        assert_eq!(processor.projection_count(), 2);

        processor.run_catch_up().await.unwrap();

        assert_eq!(*count1.read().await, 2);
        assert_eq!(*count2.read().await, 2);
    }

    #[tokio::test]
    async fn test_catch_up_applies_records_that_were_never_published() {
        let store = InMemoryEventStore::new();
        let unpublished = store
            .append(AggregateId::new(), "Test", pending(1), Version::initial())
            .await
            .unwrap();
        let published = store
            .append(AggregateId::new(), "Test", pending(1), Version::initial())
            .await
            .unwrap();

        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);
        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(projection));

        processor.publish(&published).await.unwrap();
        assert_eq!(*count_ref.read().await, 1);

        // The first record sits earlier in the log than the published one.
        processor.run_catch_up().await.unwrap();
        assert_eq!(*count_ref.read().await, 2);
        assert_eq!(processor.positions().await, vec![("CountingProjection", 2)]);

        processor.publish(&unpublished).await.unwrap();
        processor.run_catch_up().await.unwrap();
        assert_eq!(*count_ref.read().await, 2);
    }

    #[tokio::test]
    async fn test_publish_after_catch_up_is_not_reapplied() {
        let store = InMemoryEventStore::new();
        let records = store
            .append(AggregateId::new(), "Test", pending(3), Version::initial())
            .await
            .unwrap();

        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);
        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(projection));

        processor.run_catch_up().await.unwrap();
        processor.publish(&records).await.unwrap();

        assert_eq!(*count_ref.read().await, 3);
    }
}
