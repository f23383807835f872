//! Application error type mapping to HTTP status codes and envelope format.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use bothost_types::error::SupervisorError;

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Supervisor(SupervisorError),
    /// Missing or malformed caller identity.
    Unauthorized(String),
    Validation(String),
    Internal(String),
}

impl From<SupervisorError> for AppError {
    fn from(e: SupervisorError) -> Self {
        AppError::Supervisor(e)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        let message = match self {
            AppError::Supervisor(e) => e.to_string(),
            AppError::Unauthorized(msg) | AppError::Validation(msg) | AppError::Internal(msg) => {
                msg.clone()
            }
        };

        let (status, code) = match self {
            AppError::Supervisor(e) => match e {
                SupervisorError::NotFound => (StatusCode::NOT_FOUND, "BOT_NOT_FOUND"),
                SupervisorError::AccessDenied => (StatusCode::FORBIDDEN, "ACCESS_DENIED"),
                SupervisorError::AlreadyRunning(_) => (StatusCode::CONFLICT, "ALREADY_RUNNING"),
                SupervisorError::NotRunning(_) => (StatusCode::CONFLICT, "NOT_RUNNING"),
                SupervisorError::AlreadyExists(_) => (StatusCode::CONFLICT, "ALREADY_EXISTS"),
                SupervisorError::QuotaExceeded { .. } => (StatusCode::CONFLICT, "QUOTA_EXCEEDED"),
                SupervisorError::InvalidFile(_) => (StatusCode::BAD_REQUEST, "INVALID_FILE"),
                SupervisorError::Spawn(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SPAWN_FAILED"),
                SupervisorError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            },
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        (status, code, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, error = %message, "request failed");
        }
        (status, Json(ApiResponse::error(code, &message))).into_response()
    }
}
