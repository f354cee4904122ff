//! Card domain events.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use event_store::{EventId, EventRegistry};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::student::StudentId;

use super::{CardId, CardNumber, CardStatus, CardType};

/// Events that can occur on a card aggregate.
#[derive(Debug, Clone, PartialEq)]
pub enum CardEvent {
    Created(CardCreated),
    AssignedToStudent(CardAssignedToStudent),
    UnassignedFromStudent(CardUnassignedFromStudent),
    StatusChanged(CardStatusChanged),
}

impl CardEvent {
    pub const CREATED: &'static str = "CardCreated";
    pub const ASSIGNED_TO_STUDENT: &'static str = "CardAssignedToStudent";
    pub const UNASSIGNED_FROM_STUDENT: &'static str = "CardUnassignedFromStudent";
    pub const STATUS_CHANGED: &'static str = "CardStatusChanged";

    pub fn card_id(&self) -> CardId {
        match self {
            CardEvent::Created(e) => e.card_id,
            CardEvent::AssignedToStudent(e) => e.card_id,
            CardEvent::UnassignedFromStudent(e) => e.card_id,
            CardEvent::StatusChanged(e) => e.card_id,
        }
    }
}

static CARD_EVENTS: LazyLock<EventRegistry<CardEvent>> = LazyLock::new(|| {
    EventRegistry::new(super::Card::AGGREGATE_TYPE)
        .register(CardEvent::CREATED, |payload| {
            serde_json::from_value(payload).map(CardEvent::Created)
        })
        .register(CardEvent::ASSIGNED_TO_STUDENT, |payload| {
            serde_json::from_value(payload).map(CardEvent::AssignedToStudent)
        })
        .register(CardEvent::UNASSIGNED_FROM_STUDENT, |payload| {
            serde_json::from_value(payload).map(CardEvent::UnassignedFromStudent)
        })
        .register(CardEvent::STATUS_CHANGED, |payload| {
            serde_json::from_value(payload).map(CardEvent::StatusChanged)
        })
});

impl DomainEvent for CardEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CardEvent::Created(_) => CardEvent::CREATED,
            CardEvent::AssignedToStudent(_) => CardEvent::ASSIGNED_TO_STUDENT,
            CardEvent::UnassignedFromStudent(_) => CardEvent::UNASSIGNED_FROM_STUDENT,
            CardEvent::StatusChanged(_) => CardEvent::STATUS_CHANGED,
        }
    }

    fn event_id(&self) -> EventId {
        match self {
            CardEvent::Created(e) => e.event_id,
            CardEvent::AssignedToStudent(e) => e.event_id,
            CardEvent::UnassignedFromStudent(e) => e.event_id,
            CardEvent::StatusChanged(e) => e.event_id,
        }
    }

    fn occurred_on(&self) -> DateTime<Utc> {
        match self {
            CardEvent::Created(e) => e.occurred_on,
            CardEvent::AssignedToStudent(e) => e.occurred_on,
            CardEvent::UnassignedFromStudent(e) => e.occurred_on,
            CardEvent::StatusChanged(e) => e.occurred_on,
        }
    }

    fn payload(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            CardEvent::Created(e) => serde_json::to_value(e),
            CardEvent::AssignedToStudent(e) => serde_json::to_value(e),
            CardEvent::UnassignedFromStudent(e) => serde_json::to_value(e),
            CardEvent::StatusChanged(e) => serde_json::to_value(e),
        }
    }

    fn registry() -> &'static EventRegistry<Self> {
        &CARD_EVENTS
    }
}

/// A card was issued. Its issue date is `occurred_on`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardCreated {
    pub event_id: EventId,
    pub occurred_on: DateTime<Utc>,
    pub card_id: CardId,
    pub card_number: CardNumber,
    pub card_type: CardType,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardAssignedToStudent {
    pub event_id: EventId,
    pub occurred_on: DateTime<Utc>,
    pub card_id: CardId,
    pub student_id: StudentId,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardUnassignedFromStudent {
    pub event_id: EventId,
    pub occurred_on: DateTime<Utc>,
    pub card_id: CardId,
    /// The student the card was taken from.
    pub student_id: StudentId,
    pub unassigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardStatusChanged {
    pub event_id: EventId,
    pub occurred_on: DateTime<Utc>,
    pub card_id: CardId,
    pub previous_status: CardStatus,
    pub new_status: CardStatus,
}

// Convenience constructors
impl CardEvent {
    pub fn created(
        card_id: CardId,
        card_number: CardNumber,
        card_type: CardType,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        CardEvent::Created(CardCreated {
            event_id: EventId::new(),
            occurred_on: now,
            card_id,
            card_number,
            card_type,
            expires_at,
        })
    }

    pub fn assigned_to_student(card_id: CardId, student_id: StudentId, now: DateTime<Utc>) -> Self {
        CardEvent::AssignedToStudent(CardAssignedToStudent {
            event_id: EventId::new(),
            occurred_on: now,
            card_id,
            student_id,
            assigned_at: now,
        })
    }

    pub fn unassigned_from_student(
        card_id: CardId,
        student_id: StudentId,
        now: DateTime<Utc>,
    ) -> Self {
        CardEvent::UnassignedFromStudent(CardUnassignedFromStudent {
            event_id: EventId::new(),
            occurred_on: now,
            card_id,
            student_id,
            unassigned_at: now,
        })
    }

    pub fn status_changed(
        card_id: CardId,
        previous_status: CardStatus,
        new_status: CardStatus,
        now: DateTime<Utc>,
    ) -> Self {
        CardEvent::StatusChanged(CardStatusChanged {
            event_id: EventId::new(),
            occurred_on: now,
            card_id,
            previous_status,
            new_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use common::AggregateId;
    use event_store::{EventMetadata, EventRecord, Version};

    use super::*;

    fn as_record(event: &CardEvent) -> EventRecord {
        let pending = event.to_pending().unwrap();
        EventRecord {
            record_id: uuid::Uuid::new_v4(),
            aggregate_id: event.card_id().as_aggregate_id(),
            aggregate_type: "Card".to_string(),
            event_type: pending.event_type,
            payload: pending.payload,
            metadata: EventMetadata::new(pending.event_id, pending.occurred_on),
            occurred_on: pending.occurred_on,
            version: Version::first(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn every_variant_round_trips_through_its_tag() {
        let now = Utc::now();
        let card_id = CardId::new();
        let student_id = StudentId::from(AggregateId::new());
        let events = vec![
            CardEvent::created(
                card_id,
                CardNumber::generate(),
                CardType::Visitor,
                now + Duration::days(30),
                now,
            ),
            CardEvent::assigned_to_student(card_id, student_id, now),
            CardEvent::unassigned_from_student(card_id, student_id, now),
            CardEvent::status_changed(card_id, CardStatus::Active, CardStatus::Lost, now),
        ];

        for event in events {
            let decoded = CardEvent::registry().decode(&as_record(&event)).unwrap();
            assert_eq!(decoded, event);
        }
    }

    #[test]
    fn payload_is_the_variant_body() {
        let now = Utc::now();
        let event = CardEvent::status_changed(
            CardId::new(),
            CardStatus::Active,
            CardStatus::Stolen,
            now,
        );
        let payload = event.payload().unwrap();
        assert_eq!(payload["previous_status"], "Active");
        assert_eq!(payload["new_status"], "Stolen");
        assert!(payload.get("StatusChanged").is_none());
    }

    #[test]
    fn registry_knows_every_tag() {
        let registry = CardEvent::registry();
        for tag in [
            CardEvent::CREATED,
            CardEvent::ASSIGNED_TO_STUDENT,
            CardEvent::UNASSIGNED_FROM_STUDENT,
            CardEvent::STATUS_CHANGED,
        ] {
            assert!(registry.is_registered(tag), "{tag} missing");
        }
        assert_eq!(registry.aggregate_type(), "Card");
    }
}
