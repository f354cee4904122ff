use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AggregateId;

/// Schema version stamped into every record's metadata.
pub const SCHEMA_VERSION: &str = "1.0";

/// Unique identifier for a domain event, assigned when the event is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of an event within its stream.
///
/// `Version::initial()` (0) means "no history". The first event of a stream
/// is version 1 and every later event is exactly one higher than the last.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// The version of a stream with no events.
    pub fn initial() -> Self {
        Self(0)
    }

    /// The version assigned to the first event of a stream.
    pub fn first() -> Self {
        Self(1)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Moves forward by `count` events.
    pub fn advance(&self, count: usize) -> Self {
        Self(self.0 + count as i64)
    }

    /// Moves back by `count` events, never below the initial version.
    pub fn rewind(&self, count: usize) -> Self {
        Self((self.0 - count as i64).max(0))
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// Auxiliary data stored next to the payload.
///
/// Kept apart from the payload so the body of an event can evolve without
/// touching the envelope every reader relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub event_id: EventId,
    pub occurred_on: DateTime<Utc>,
    pub schema_version: String,
}

impl EventMetadata {
    pub fn new(event_id: EventId, occurred_on: DateTime<Utc>) -> Self {
        Self {
            event_id,
            occurred_on,
            schema_version: SCHEMA_VERSION.to_string(),
        }
    }
}

/// A serialized domain event that has not been assigned a version yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvent {
    pub event_id: EventId,
    pub event_type: String,
    pub occurred_on: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl PendingEvent {
    pub fn new(
        event_id: EventId,
        event_type: impl Into<String>,
        occurred_on: DateTime<Utc>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id,
            event_type: event_type.into(),
            occurred_on,
            payload,
        }
    }

    /// Seals the event into a record at the given stream position.
    pub(crate) fn into_record(
        self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        version: Version,
        created_at: DateTime<Utc>,
    ) -> EventRecord {
        EventRecord {
            record_id: Uuid::new_v4(),
            aggregate_id,
            aggregate_type: aggregate_type.to_string(),
            event_type: self.event_type,
            payload: self.payload,
            metadata: EventMetadata::new(self.event_id, self.occurred_on),
            occurred_on: self.occurred_on,
            version,
            created_at,
        }
    }
}

/// One persisted event, exactly as it lives in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Identity of the storage row.
    pub record_id: Uuid,

    pub aggregate_id: AggregateId,

    /// Logical kind of stream, e.g. "Card" or "Student".
    pub aggregate_type: String,

    /// Tag used to route the payload to a decoder.
    pub event_type: String,

    /// The serialized event body.
    pub payload: serde_json::Value,

    pub metadata: EventMetadata,

    /// When the event was raised.
    pub occurred_on: DateTime<Utc>,

    /// 1-based position within the stream.
    pub version: Version,

    /// When the store accepted the record.
    pub created_at: DateTime<Utc>,
}

impl EventRecord {
    pub fn event_id(&self) -> EventId {
        self.metadata.event_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_arithmetic() {
        assert_eq!(Version::initial().next(), Version::first());
        assert_eq!(Version::new(2).advance(3), Version::new(5));
        assert_eq!(Version::new(5).rewind(3), Version::new(2));
        assert_eq!(Version::new(1).rewind(4), Version::initial());
    }

    #[test]
    fn metadata_carries_schema_version() {
        let metadata = EventMetadata::new(EventId::new(), Utc::now());
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["schema_version"], "1.0");
        assert!(json.get("event_id").is_some());
        assert!(json.get("occurred_on").is_some());
    }

    #[test]
    fn pending_event_sealed_into_record() {
        let aggregate_id = AggregateId::new();
        let event_id = EventId::new();
        let occurred_on = Utc::now();
        let pending = PendingEvent::new(
            event_id,
            "CardCreated",
            occurred_on,
            serde_json::json!({"card_type": "Student"}),
        );

        let created_at = Utc::now();
        let record = pending.into_record(aggregate_id, "Card", Version::new(3), created_at);

        assert_eq!(record.aggregate_id, aggregate_id);
        assert_eq!(record.aggregate_type, "Card");
        assert_eq!(record.event_type, "CardCreated");
        assert_eq!(record.version, Version::new(3));
        assert_eq!(record.event_id(), event_id);
        assert_eq!(record.occurred_on, occurred_on);
        assert_eq!(record.metadata.occurred_on, occurred_on);
        assert_eq!(record.created_at, created_at);
    }
}
