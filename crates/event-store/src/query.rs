use chrono::{DateTime, Utc};

use crate::AggregateId;

/// Filter for browsing the log.
///
/// Every filter is optional; an empty query matches the whole store.
/// Results are always ordered by storage time.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub aggregate_id: Option<AggregateId>,

    pub aggregate_type: Option<String>,

    /// Any of these tags.
    pub event_types: Option<Vec<String>>,

    /// Records stored at or after this instant.
    pub stored_after: Option<DateTime<Utc>>,

    /// Records stored at or before this instant.
    pub stored_before: Option<DateTime<Utc>>,

    pub limit: Option<usize>,

    pub offset: Option<usize>,
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for a specific aggregate.
    pub fn for_aggregate(aggregate_id: AggregateId) -> Self {
        Self {
            aggregate_id: Some(aggregate_id),
            ..Default::default()
        }
    }

    pub fn aggregate_type(mut self, aggregate_type: impl Into<String>) -> Self {
        self.aggregate_type = Some(aggregate_type.into());
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_types = Some(vec![event_type.into()]);
        self
    }

    pub fn event_types(mut self, event_types: Vec<String>) -> Self {
        self.event_types = Some(event_types);
        self
    }

    pub fn stored_after(mut self, at: DateTime<Utc>) -> Self {
        self.stored_after = Some(at);
        self
    }

    pub fn stored_before(mut self, at: DateTime<Utc>) -> Self {
        self.stored_before = Some(at);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Whether a record passes every filter except paging.
    pub fn matches(&self, record: &crate::EventRecord) -> bool {
        if let Some(id) = self.aggregate_id
            && record.aggregate_id != id
        {
            return false;
        }
        if let Some(ref aggregate_type) = self.aggregate_type
            && &record.aggregate_type != aggregate_type
        {
            return false;
        }
        if let Some(ref types) = self.event_types
            && !types.contains(&record.event_type)
        {
            return false;
        }
        if let Some(after) = self.stored_after
            && record.created_at < after
        {
            return false;
        }
        if let Some(before) = self.stored_before
            && record.created_at > before
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_for_aggregate() {
        let id = AggregateId::new();
        let query = EventQuery::for_aggregate(id);

        assert_eq!(query.aggregate_id, Some(id));
        assert!(query.event_types.is_none());
        assert!(query.limit.is_none());
    }

    #[test]
    fn query_builder_chain() {
        let query = EventQuery::new()
            .aggregate_type("Card")
            .event_type("CardAssignedToStudent")
            .limit(50)
            .offset(10);

        assert_eq!(query.aggregate_type.as_deref(), Some("Card"));
        assert_eq!(
            query.event_types,
            Some(vec!["CardAssignedToStudent".to_string()])
        );
        assert_eq!(query.limit, Some(50));
        assert_eq!(query.offset, Some(10));
    }
}
