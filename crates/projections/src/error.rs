//! Projection error types.

use thiserror::Error;

/// Errors that can occur during projection processing.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// Reading the log failed, or a record could not be decoded.
    #[error("Event store error: {0}")]
    EventStore(#[from] event_store::EventStoreError),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
