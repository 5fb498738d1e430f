//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, ErrorKind, SlotError};
use projections::ProjectionError;
use scheduling::{ConditionsError, SchedulingError};
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),
    /// Domain logic error.
    #[error(transparent)]
    Domain(DomainError),
    /// Booking coordination error.
    #[error(transparent)]
    Scheduling(SchedulingError),
    /// Internal server error.
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Scheduling(err) => scheduling_error_to_response(err),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "request failed");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    let status = match err.kind() {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidState => StatusCode::CONFLICT,
        ErrorKind::ValidationFailed => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

fn scheduling_error_to_response(err: SchedulingError) -> (StatusCode, String) {
    match err {
        SchedulingError::Domain(err) => domain_error_to_response(err),
        SchedulingError::ConditionsNotMet { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        SchedulingError::Conditions(ref conditions) => {
            let status = match conditions {
                ConditionsError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                ConditionsError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                ConditionsError::ToolError { .. } => StatusCode::BAD_GATEWAY,
            };
            (status, err.to_string())
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<SlotError> for ApiError {
    fn from(err: SlotError) -> Self {
        ApiError::Domain(err.into())
    }
}

impl From<SchedulingError> for ApiError {
    fn from(err: SchedulingError) -> Self {
        ApiError::Scheduling(err)
    }
}

impl From<ProjectionError> for ApiError {
    fn from(err: ProjectionError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
