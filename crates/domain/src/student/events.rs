//! Student domain events.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use event_store::{EventId, EventRegistry};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{Email, PersonName, StudentId, StudentNumber, StudentStatus};

/// Events that can occur on a student aggregate.
#[derive(Debug, Clone, PartialEq)]
pub enum StudentEvent {
    Created(StudentCreated),
    StatusChanged(StudentStatusChanged),
    ProfileUpdated(StudentProfileUpdated),
}

impl StudentEvent {
    pub const CREATED: &'static str = "StudentCreated";
    pub const STATUS_CHANGED: &'static str = "StudentStatusChanged";
    pub const PROFILE_UPDATED: &'static str = "StudentProfileUpdated";

    pub fn student_id(&self) -> StudentId {
        match self {
            StudentEvent::Created(e) => e.student_id,
            StudentEvent::StatusChanged(e) => e.student_id,
            StudentEvent::ProfileUpdated(e) => e.student_id,
        }
    }
}

static STUDENT_EVENTS: LazyLock<EventRegistry<StudentEvent>> = LazyLock::new(|| {
    EventRegistry::new(super::Student::AGGREGATE_TYPE)
        .register(StudentEvent::CREATED, |payload| {
            serde_json::from_value(payload).map(StudentEvent::Created)
        })
        .register(StudentEvent::STATUS_CHANGED, |payload| {
            serde_json::from_value(payload).map(StudentEvent::StatusChanged)
        })
        .register(StudentEvent::PROFILE_UPDATED, |payload| {
            serde_json::from_value(payload).map(StudentEvent::ProfileUpdated)
        })
});

impl DomainEvent for StudentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StudentEvent::Created(_) => StudentEvent::CREATED,
            StudentEvent::StatusChanged(_) => StudentEvent::STATUS_CHANGED,
            StudentEvent::ProfileUpdated(_) => StudentEvent::PROFILE_UPDATED,
        }
    }

    fn event_id(&self) -> EventId {
        match self {
            StudentEvent::Created(e) => e.event_id,
            StudentEvent::StatusChanged(e) => e.event_id,
            StudentEvent::ProfileUpdated(e) => e.event_id,
        }
    }

    fn occurred_on(&self) -> DateTime<Utc> {
        match self {
            StudentEvent::Created(e) => e.occurred_on,
            StudentEvent::StatusChanged(e) => e.occurred_on,
            StudentEvent::ProfileUpdated(e) => e.occurred_on,
        }
    }

    fn payload(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            StudentEvent::Created(e) => serde_json::to_value(e),
            StudentEvent::StatusChanged(e) => serde_json::to_value(e),
            StudentEvent::ProfileUpdated(e) => serde_json::to_value(e),
        }
    }

    fn registry() -> &'static EventRegistry<Self> {
        &STUDENT_EVENTS
    }
}

/// A student was enrolled. New students are always `Active`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentCreated {
    pub event_id: EventId,
    pub occurred_on: DateTime<Utc>,
    pub student_id: StudentId,
    pub first_name: PersonName,
    pub last_name: PersonName,
    pub email: Email,
    pub student_number: StudentNumber,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentStatusChanged {
    pub event_id: EventId,
    pub occurred_on: DateTime<Utc>,
    pub student_id: StudentId,
    pub previous_status: StudentStatus,
    pub new_status: StudentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProfileUpdated {
    pub event_id: EventId,
    pub occurred_on: DateTime<Utc>,
    pub student_id: StudentId,
    pub first_name: PersonName,
    pub last_name: PersonName,
    pub email: Email,
}

// Convenience constructors
impl StudentEvent {
    pub fn created(
        student_id: StudentId,
        first_name: PersonName,
        last_name: PersonName,
        email: Email,
        student_number: StudentNumber,
        now: DateTime<Utc>,
    ) -> Self {
        StudentEvent::Created(StudentCreated {
            event_id: EventId::new(),
            occurred_on: now,
            student_id,
            first_name,
            last_name,
            email,
            student_number,
        })
    }

    pub fn status_changed(
        student_id: StudentId,
        previous_status: StudentStatus,
        new_status: StudentStatus,
        now: DateTime<Utc>,
    ) -> Self {
        StudentEvent::StatusChanged(StudentStatusChanged {
            event_id: EventId::new(),
            occurred_on: now,
            student_id,
            previous_status,
            new_status,
        })
    }

    pub fn profile_updated(
        student_id: StudentId,
        first_name: PersonName,
        last_name: PersonName,
        email: Email,
        now: DateTime<Utc>,
    ) -> Self {
        StudentEvent::ProfileUpdated(StudentProfileUpdated {
            event_id: EventId::new(),
            occurred_on: now,
            student_id,
            first_name,
            last_name,
            email,
        })
    }
}
