//! Append-then-publish coordination for one save.

use std::sync::Arc;

use common::AggregateId;
use event_store::{EventRecord, EventStore, PendingEvent, Version};
use projections::ProjectionProcessor;

use crate::Result;

/// Appends a batch to the store and then hands the stored records to the
/// projections.
///
/// The two steps touch separate resources and are not wrapped in a single
/// transaction. If publishing fails the events stay appended and the read
/// models lag until the next rebuild; the command still succeeds.
pub struct UnitOfWork<S: EventStore> {
    store: S,
    processor: Arc<ProjectionProcessor<S>>,
}

impl<S: EventStore + Clone> Clone for UnitOfWork<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            processor: Arc::clone(&self.processor),
        }
    }
}

impl<S: EventStore> UnitOfWork<S> {
    pub fn new(store: S, processor: Arc<ProjectionProcessor<S>>) -> Self {
        Self { store, processor }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Appends `events` at `expected_version`, then publishes the stored records
    /// in order. An empty batch writes and publishes nothing.
    #[tracing::instrument(skip(self, events), fields(count = events.len()))]
    pub async fn commit(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        events: Vec<PendingEvent>,
        expected_version: Version,
    ) -> Result<Vec<EventRecord>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let records = self
            .store
            .append(aggregate_id, aggregate_type, events, expected_version)
            .await?;

        if let Err(error) = self.processor.publish(&records).await {
            tracing::error!(
                %aggregate_id,
                %error,
                "events appended but read models were not updated"
            );
        }

        Ok(records)
    }
}
