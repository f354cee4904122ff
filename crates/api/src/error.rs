//! API error types with HTTP response mapping.

use application::ApplicationError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed path or query parameter.
    BadRequest(String),
    /// Error returned by a command or query handler.
    Application(ApplicationError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Application(err) => application_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn application_error_to_response(err: ApplicationError) -> (StatusCode, String) {
    match &err {
        ApplicationError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        ApplicationError::ConcurrencyConflict { .. } => (StatusCode::CONFLICT, err.to_string()),
        ApplicationError::Invariant(_) | ApplicationError::Validation(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        _ => {
            tracing::error!(error = %err, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            )
        }
    }
}

impl From<ApplicationError> for ApiError {
    fn from(err: ApplicationError) -> Self {
        ApiError::Application(err)
    }
}

impl From<domain::ValidationError> for ApiError {
    fn from(err: domain::ValidationError) -> Self {
        ApiError::Application(err.into())
    }
}
