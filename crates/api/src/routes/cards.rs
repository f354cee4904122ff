//! Card issue, assignment, and status endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use application::{AssignCard, CardAssigned, CardIssued, CardUnassigned, CreateCard};
use chrono::{DateTime, Utc};
use domain::{CardId, CardStatus, CardType, StudentId};
use event_store::EventStore;
use projections::CardRow;
use serde::Deserialize;

use super::{AppState, parse_id};
use crate::error::ApiError;

const DEFAULT_EXPIRY_WINDOW_DAYS: i64 = 30;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateCardRequest {
    pub card_type: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct AssignCardRequest {
    pub student_id: String,
}

#[derive(Deserialize)]
pub struct ChangeStatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct ExpiringParams {
    pub days: Option<i64>,
}

// -- Handlers --

/// POST /cards: issue a new card. The response is the only place the full
/// card number is returned.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<AppState<S>>,
    Json(req): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<CardIssued>), ApiError> {
    let cmd = CreateCard {
        card_type: req.card_type.parse::<CardType>()?,
        expires_at: req.expires_at,
    };
    let issued = state.cards.create_card(cmd).await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

/// GET /cards: every card, ordered by card number.
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<AppState<S>>,
) -> Json<Vec<CardRow>> {
    Json(state.cards.cards().await)
}

/// GET /cards/available: active, unassigned, unexpired cards.
pub async fn available<S: EventStore + Clone + 'static>(
    State(state): State<AppState<S>>,
) -> Json<Vec<CardRow>> {
    Json(state.cards.available_cards().await)
}

/// GET /cards/assigned
pub async fn assigned<S: EventStore + Clone + 'static>(
    State(state): State<AppState<S>>,
) -> Json<Vec<CardRow>> {
    Json(state.cards.assigned_cards().await)
}

/// GET /cards/expiring?days=N: active cards expiring within N days (default 30).
pub async fn expiring<S: EventStore + Clone + 'static>(
    State(state): State<AppState<S>>,
    Query(params): Query<ExpiringParams>,
) -> Result<Json<Vec<CardRow>>, ApiError> {
    let days = params.days.unwrap_or(DEFAULT_EXPIRY_WINDOW_DAYS);
    if days < 0 {
        return Err(ApiError::BadRequest(format!(
            "days must not be negative, got {days}"
        )));
    }
    Ok(Json(state.cards.expiring_cards(days).await))
}

/// GET /cards/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<CardRow>, ApiError> {
    let card_id: CardId = parse_id(&id)?;
    Ok(Json(state.cards.card(card_id).await?))
}

/// POST /cards/{id}/assign
#[tracing::instrument(skip(state, req))]
pub async fn assign<S: EventStore + Clone + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Json(req): Json<AssignCardRequest>,
) -> Result<Json<CardAssigned>, ApiError> {
    let cmd = AssignCard {
        card_id: parse_id(&id)?,
        student_id: parse_id::<StudentId>(&req.student_id)?,
    };
    Ok(Json(state.cards.assign_card(cmd).await?))
}

/// POST /cards/{id}/unassign
#[tracing::instrument(skip(state))]
pub async fn unassign<S: EventStore + Clone + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<CardUnassigned>, ApiError> {
    let card_id: CardId = parse_id(&id)?;
    Ok(Json(state.cards.unassign_card(card_id).await?))
}

/// POST /cards/{id}/status
#[tracing::instrument(skip(state, req))]
pub async fn change_status<S: EventStore + Clone + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<Json<CardRow>, ApiError> {
    let card_id: CardId = parse_id(&id)?;
    let status = req.status.parse::<CardStatus>()?;
    Ok(Json(state.cards.change_card_status(card_id, status).await?))
}

/// POST /cards/{id}/report-lost
pub async fn report_lost<S: EventStore + Clone + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<CardRow>, ApiError> {
    let card_id: CardId = parse_id(&id)?;
    Ok(Json(state.cards.report_lost(card_id).await?))
}

/// POST /cards/{id}/report-stolen
pub async fn report_stolen<S: EventStore + Clone + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<CardRow>, ApiError> {
    let card_id: CardId = parse_id(&id)?;
    Ok(Json(state.cards.report_stolen(card_id).await?))
}

/// POST /cards/{id}/report-damaged
pub async fn report_damaged<S: EventStore + Clone + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<CardRow>, ApiError> {
    let card_id: CardId = parse_id(&id)?;
    Ok(Json(state.cards.report_damaged(card_id).await?))
}
