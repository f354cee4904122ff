//! Route handlers, one module per resource.

pub mod cards;
pub mod events;
pub mod health;
pub mod metrics;
pub mod students;

use std::sync::Arc;

use application::Application;
use common::AggregateId;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub type AppState<S> = Arc<Application<S>>;

/// Parses a path segment into a typed identifier.
fn parse_id<T: From<AggregateId>>(id: &str) -> Result<T, ApiError> {
    id.parse::<AggregateId>()
        .map(T::from)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
