//! services/api/src/web/response.rs
//!
//! Maps domain and port errors onto HTTP status codes and JSON bodies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use timetable_core::{
    ClashError, Conflict, FieldIssue, GridError, PortError, ResolutionError, Slot, ValidationError,
};
use tracing::error;
use utoipa::ToSchema;

//=========================================================================================
// Error Bodies
//=========================================================================================

/// The body of every plain error response.
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// 422: the slot form has missing or invalid fields.
#[derive(Serialize, ToSchema)]
pub struct ValidationResponse {
    pub error: String,
    pub issues: Vec<FieldIssue>,
}

/// 409: the slot clashes. `candidate` is what would have been stored.
#[derive(Serialize, ToSchema)]
pub struct ClashResponse {
    pub error: String,
    pub candidate: Slot,
    pub conflicts: Vec<Conflict>,
}

//=========================================================================================
// RestError
//=========================================================================================

/// Every way a REST handler can fail.
#[derive(Debug)]
pub enum RestError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Validation(ValidationError),
    Clash(ClashError),
    Internal(String),
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        match self {
            RestError::BadRequest(message) => plain(StatusCode::BAD_REQUEST, message),
            RestError::NotFound(message) => plain(StatusCode::NOT_FOUND, message),
            RestError::Conflict(message) => plain(StatusCode::CONFLICT, message),
            RestError::Validation(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ValidationResponse {
                    error: err.to_string(),
                    issues: err.issues,
                }),
            )
                .into_response(),
            RestError::Clash(err) => (
                StatusCode::CONFLICT,
                Json(ClashResponse {
                    error: err.to_string(),
                    candidate: err.candidate,
                    conflicts: err.conflicts,
                }),
            )
                .into_response(),
            RestError::Internal(message) => plain(StatusCode::INTERNAL_SERVER_ERROR, message),
        }
    }
}

fn plain(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

impl From<PortError> for RestError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(message) => RestError::NotFound(message),
            PortError::Unexpected(message) => {
                error!("Port failure: {}", message);
                RestError::Internal("An unexpected error occurred".to_string())
            }
        }
    }
}

impl From<GridError> for RestError {
    fn from(err: GridError) -> Self {
        match err {
            GridError::Validation(err) => RestError::Validation(err),
            GridError::Clash(err) => RestError::Clash(err),
            GridError::UnknownSlot(_) => RestError::NotFound(err.to_string()),
            GridError::DuplicateSlot(_) => RestError::Conflict(err.to_string()),
        }
    }
}

impl From<ResolutionError> for RestError {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::NothingPending => RestError::Conflict(err.to_string()),
            ResolutionError::Grid(err) => err.into(),
        }
    }
}

impl From<ValidationError> for RestError {
    fn from(err: ValidationError) -> Self {
        RestError::Validation(err)
    }
}
