//! Application Error Types
//!
//! Centralized error handling with Axum integration.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// When set, internal error details are returned to clients instead of a
/// generic message. Toggled once at startup from `expose_internal_errors`.
static EXPOSE_INTERNAL: AtomicBool = AtomicBool::new(false);

/// Enable or disable exposing internal error details in responses.
pub fn set_expose_internal_errors(enabled: bool) {
    EXPOSE_INTERNAL.store(enabled, Ordering::Relaxed);
}

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// HTTP status and stable numeric code for this error.
    pub fn status_and_code(&self) -> (StatusCode, u16) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, 10001),
            AppError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, 10002),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, 10003),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, 10004),
            AppError::Conflict(_) => (StatusCode::CONFLICT, 10005),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, 10007),
            AppError::Internal(_) | AppError::Database(_) | AppError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, 10000)
            }
        }
    }

    /// Message safe to hand to a client, on HTTP or over the realtime channel.
    pub fn client_message(&self) -> String {
        match self {
            AppError::NotFound(msg)
            | AppError::InvalidArgument(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::Conflict(msg)
            | AppError::Validation(msg) => msg.clone(),
            AppError::Internal(_) | AppError::Database(_) | AppError::Io(_) => {
                if EXPOSE_INTERNAL.load(Ordering::Relaxed) {
                    self.to_string()
                } else {
                    "Internal server error".into()
                }
            }
        }
    }

    fn is_internal(&self) -> bool {
        matches!(
            self,
            AppError::Internal(_) | AppError::Database(_) | AppError::Io(_)
        )
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

/// Field-level validation error
#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_internal() {
            tracing::error!(error = %self, "Request failed with internal error");
        }

        let (status, code) = self.status_and_code();
        let body = ErrorResponse {
            code,
            message: self.client_message(),
            errors: None,
        };

        (status, Json(body)).into_response()
    }
}
