//! Diagnostic listing of stored events.

use domain::{Card, CardEvent, DomainEvent, Student, StudentEvent};
use event_store::{AggregateId, EventQuery, EventRecord, EventRegistry, EventStore};

use crate::Result;

/// Read-only view over the raw log for administrative browsing.
///
/// Records that no registry can resolve are logged and left out rather than
/// failing the listing. Nothing here is used by command handling.
pub struct EventLog<S: EventStore> {
    store: S,
}

impl<S: EventStore> EventLog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Every event, ordered by storage time.
    #[tracing::instrument(skip(self))]
    pub async fn all_events(&self) -> Result<Vec<EventRecord>> {
        let records = self.store.list_all().await?;
        Ok(resolvable(&records))
    }

    /// The stream of one aggregate, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn events_for(&self, aggregate_id: AggregateId) -> Result<Vec<EventRecord>> {
        let records = self.store.load(aggregate_id).await?;
        Ok(resolvable(&records))
    }

    /// Events matching a filter, ordered by storage time.
    #[tracing::instrument(skip(self))]
    pub async fn query(&self, query: EventQuery) -> Result<Vec<EventRecord>> {
        let records = self.store.query_events(query).await?;
        Ok(resolvable(&records))
    }
}

fn resolvable(records: &[EventRecord]) -> Vec<EventRecord> {
    records
        .chunk_by(|a, b| a.aggregate_type == b.aggregate_type)
        .flat_map(|run| match run[0].aggregate_type.as_str() {
            Card::AGGREGATE_TYPE => decodable(CardEvent::registry(), run),
            Student::AGGREGATE_TYPE => decodable(StudentEvent::registry(), run),
            other => {
                tracing::warn!(
                    aggregate_type = other,
                    count = run.len(),
                    "skipping records of unknown aggregate type"
                );
                Vec::new()
            }
        })
        .collect()
}

fn decodable<E>(registry: &EventRegistry<E>, run: &[EventRecord]) -> Vec<EventRecord> {
    registry
        .decode_lenient(run)
        .into_iter()
        .map(|(record, _)| record.clone())
        .collect()
}
