//! Student enrollment, profile, and status endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use application::{CreateStudent, StudentEnrolled, UpdateStudentProfile};
use domain::{StudentId, StudentStatus};
use event_store::EventStore;
use projections::{CardRow, StudentRow};
use serde::Deserialize;

use super::{AppState, parse_id};
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateStudentRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub student_number: String,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct ChangeStatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

// -- Handlers --

/// POST /students: enroll a student.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<AppState<S>>,
    Json(req): Json<CreateStudentRequest>,
) -> Result<(StatusCode, Json<StudentEnrolled>), ApiError> {
    let cmd = CreateStudent {
        first_name: req.first_name,
        last_name: req.last_name,
        email: req.email,
        student_number: req.student_number,
    };
    let enrolled = state.students.create_student(cmd).await?;
    Ok((StatusCode::CREATED, Json(enrolled)))
}

/// GET /students: every student, ordered by last then first name.
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<AppState<S>>,
) -> Json<Vec<StudentRow>> {
    Json(state.students.students().await)
}

/// GET /students/active
pub async fn active<S: EventStore + Clone + 'static>(
    State(state): State<AppState<S>>,
) -> Json<Vec<StudentRow>> {
    Json(state.students.active_students().await)
}

/// GET /students/search?q=term: case-insensitive match on names, email, and number.
pub async fn search<S: EventStore + Clone + 'static>(
    State(state): State<AppState<S>>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<StudentRow>> {
    Json(state.students.search_students(&params.q).await)
}

/// GET /students/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<StudentRow>, ApiError> {
    let student_id: StudentId = parse_id(&id)?;
    Ok(Json(state.students.student(student_id).await?))
}

/// GET /students/{id}/card: the card currently assigned to the student.
#[tracing::instrument(skip(state))]
pub async fn card<S: EventStore + Clone + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<CardRow>, ApiError> {
    let student_id: StudentId = parse_id(&id)?;
    Ok(Json(state.cards.card_for_student(student_id).await?))
}

/// POST /students/{id}/status
#[tracing::instrument(skip(state, req))]
pub async fn change_status<S: EventStore + Clone + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<Json<StudentRow>, ApiError> {
    let student_id: StudentId = parse_id(&id)?;
    let status = req.status.parse::<StudentStatus>()?;
    Ok(Json(
        state
            .students
            .change_student_status(student_id, status)
            .await?,
    ))
}

/// PUT /students/{id}/profile
#[tracing::instrument(skip(state, req))]
pub async fn update_profile<S: EventStore + Clone + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<StudentRow>, ApiError> {
    let cmd = UpdateStudentProfile {
        student_id: parse_id(&id)?,
        first_name: req.first_name,
        last_name: req.last_name,
        email: req.email,
    };
    Ok(Json(state.students.update_profile(cmd).await?))
}
