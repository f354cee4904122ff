//! Raw event log browsing.

use axum::Json;
use axum::extract::{Path, Query, State};
use common::AggregateId;
use event_store::{EventQuery, EventRecord, EventStore};
use serde::{Deserialize, Serialize};

use super::{AppState, parse_id};
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct EventFilter {
    pub aggregate_type: Option<String>,
    pub event_type: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl EventFilter {
    fn is_empty(&self) -> bool {
        self.aggregate_type.is_none()
            && self.event_type.is_none()
            && self.limit.is_none()
            && self.offset.is_none()
    }

    fn into_query(self) -> EventQuery {
        let mut query = EventQuery::new();
        if let Some(aggregate_type) = self.aggregate_type {
            query = query.aggregate_type(aggregate_type);
        }
        if let Some(event_type) = self.event_type {
            query = query.event_type(event_type);
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        if let Some(offset) = self.offset {
            query = query.offset(offset);
        }
        query
    }
}

/// Response type for one stored event.
#[derive(Serialize)]
pub struct EventResponse {
    pub event_id: String,
    pub event_type: String,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub version: i64,
    pub occurred_on: String,
    pub stored_at: String,
    pub payload: serde_json::Value,
}

impl From<EventRecord> for EventResponse {
    fn from(record: EventRecord) -> Self {
        Self {
            event_id: record.event_id().to_string(),
            event_type: record.event_type,
            aggregate_id: record.aggregate_id.to_string(),
            aggregate_type: record.aggregate_type,
            version: record.version.as_i64(),
            occurred_on: record.occurred_on.to_rfc3339(),
            stored_at: record.created_at.to_rfc3339(),
            payload: record.payload,
        }
    }
}

/// GET /events: stored events in storage order, optionally filtered by
/// `aggregate_type`, `event_type`, `limit`, and `offset`.
#[tracing::instrument(skip(state, filter))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<AppState<S>>,
    Query(filter): Query<EventFilter>,
) -> Result<Json<Vec<EventResponse>>, ApiError> {
    let records = if filter.is_empty() {
        state.events.all_events().await?
    } else {
        state.events.query(filter.into_query()).await?
    };
    Ok(Json(records.into_iter().map(EventResponse::from).collect()))
}

/// GET /events/aggregate/{id}: one card's or student's stream, oldest first.
#[tracing::instrument(skip(state))]
pub async fn for_aggregate<S: EventStore + Clone + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<EventResponse>>, ApiError> {
    let aggregate_id: AggregateId = parse_id(&id)?;
    let records = state.events.events_for(aggregate_id).await?;
    Ok(Json(records.into_iter().map(EventResponse::from).collect()))
}
