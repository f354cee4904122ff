use thiserror::Error;
use uuid::Uuid;

use crate::{AggregateId, Version};

/// Errors that can occur when interacting with the event store.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// The stream was not at the version the caller expected. Nothing was
    /// appended; the caller must reload and retry the whole command.
    #[error(
        "Concurrency conflict for aggregate {aggregate_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// A stored record carries a tag no registered event variant claims.
    #[error("Unknown event type '{event_type}' for aggregate type '{aggregate_type}'")]
    UnknownEventType {
        aggregate_type: String,
        event_type: String,
    },

    /// A stored record has a known tag but its payload does not decode.
    #[error("Corrupt event record {record_id} ({event_type}): {source}")]
    CorruptEventRecord {
        record_id: Uuid,
        event_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventStoreError {
    /// True for failures caused by unreadable history rather than by the
    /// caller or the infrastructure.
    pub fn is_corrupt_history(&self) -> bool {
        matches!(
            self,
            EventStoreError::UnknownEventType { .. } | EventStoreError::CorruptEventRecord { .. }
        )
    }
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;
