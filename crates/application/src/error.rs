//! Application error types.

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{CardError, CardId, StudentError, StudentId, StudentStatus, ValidationError};
use event_store::{EventStoreError, Version};
use projections::ProjectionError;
use thiserror::Error;

/// A business rule that rejected a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error(transparent)]
    Card(#[from] CardError),

    #[error(transparent)]
    Student(#[from] StudentError),

    #[error("A student with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("A student with number '{0}' already exists")]
    DuplicateStudentNumber(String),

    #[error("Cannot assign a card to a student with status {status}")]
    InactiveStudent { status: StudentStatus },

    #[error("Student {student_id} already has card {card_id} assigned")]
    StudentAlreadyHasCard { student_id: StudentId, card_id: CardId },

    #[error("Expiration date {expires_at} must be in the future")]
    ExpiryNotInFuture { expires_at: DateTime<Utc> },
}

/// Errors surfaced by command and query handlers.
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    /// Another command changed the aggregate first. Reload and retry the command.
    #[error(
        "Aggregate {aggregate_id} was modified concurrently: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Stored history could not be turned back into an aggregate.
    #[error("Event history cannot be replayed: {0}")]
    CorruptHistory(#[source] EventStoreError),

    #[error("{aggregate_type} raised events before it had an identity")]
    MissingIdentity { aggregate_type: &'static str },

    #[error("Event store error: {0}")]
    EventStore(#[source] EventStoreError),

    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApplicationError {
    pub(crate) fn not_found(kind: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            kind,
            key: key.to_string(),
        }
    }
}

impl From<EventStoreError> for ApplicationError {
    fn from(error: EventStoreError) -> Self {
        match error {
            EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual,
            } => Self::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual,
            },
            error if error.is_corrupt_history() => Self::CorruptHistory(error),
            error => Self::EventStore(error),
        }
    }
}

impl From<CardError> for ApplicationError {
    fn from(error: CardError) -> Self {
        Self::Invariant(error.into())
    }
}

impl From<StudentError> for ApplicationError {
    fn from(error: StudentError) -> Self {
        Self::Invariant(error.into())
    }
}

/// Result type for application operations.
pub type Result<T> = std::result::Result<T, ApplicationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_conflict_becomes_retryable_conflict() {
        let aggregate_id = AggregateId::new();
        let error: ApplicationError = EventStoreError::ConcurrencyConflict {
            aggregate_id,
            expected: Version::new(1),
            actual: Version::new(2),
        }
        .into();
        assert!(matches!(
            error,
            ApplicationError::ConcurrencyConflict { actual, .. } if actual == Version::new(2)
        ));
    }

    #[test]
    fn unknown_tag_becomes_corrupt_history() {
        let error: ApplicationError = EventStoreError::UnknownEventType {
            aggregate_type: "Card".to_string(),
            event_type: "CardShredded".to_string(),
        }
        .into();
        assert!(matches!(error, ApplicationError::CorruptHistory(_)));
    }

    #[test]
    fn card_rule_becomes_invariant() {
        let error: ApplicationError = CardError::NotAssigned.into();
        assert!(matches!(
            error,
            ApplicationError::Invariant(InvariantViolation::Card(CardError::NotAssigned))
        ));
        assert_eq!(error.to_string(), "Card is not assigned to any student");
    }
}
