//! Error types for HTTP handlers.
//!
//! Bridges the core error taxonomy to HTTP responses. Every response body
//! carries a stable `code`, a human-readable `message` and a `retryable`
//! flag so clients can tell a transient conflict from a terminal failure.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rifa_core::CoreError;
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// Wraps domain errors and provides HTTP-friendly error responses via
/// Axum's `IntoResponse`.
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: &'static str,
    /// Whether the client may retry the same request
    retryable: bool,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(
        status: StatusCode,
        message: String,
        code: &'static str,
        retryable: bool,
    ) -> Self {
        Self {
            status,
            message,
            code,
            retryable,
            source: None,
        }
    }

    /// Attach the underlying error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into(), "BAD_REQUEST", false)
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message.into(), "UNAUTHORIZED", false)
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message.into(), "FORBIDDEN", false)
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            "NOT_FOUND",
            false,
        )
    }

    /// Create a 422 Unprocessable Entity error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            message.into(),
            "VALIDATION_ERROR",
            false,
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR",
            false,
        )
    }

    /// The HTTP status this error maps to.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: &'static str,
    /// Human-readable error message.
    message: String,
    /// Whether the client may retry the same request.
    retryable: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = %self.code,
                message = %self.message,
                source = ?self.source,
                "internal server error"
            );
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
            retryable: self.retryable,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match &err {
            CoreError::Validation(_) | CoreError::InvalidQuantity { .. } => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                message,
                "VALIDATION_ERROR",
                false,
            ),
            CoreError::NotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, message, "NOT_FOUND", false)
            }
            CoreError::RaffleClosed(_) => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                message,
                "RAFFLE_CLOSED",
                false,
            ),
            CoreError::InsufficientInventory { .. } => Self::new(
                StatusCode::CONFLICT,
                message,
                "INSUFFICIENT_INVENTORY",
                false,
            ),
            CoreError::Conflict(_) => Self::new(StatusCode::CONFLICT, message, "CONFLICT", true),
            CoreError::NoTicketsSold(_) => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                message,
                "NO_TICKETS_SOLD",
                false,
            ),
            CoreError::AlreadyDrawn(_) => {
                Self::new(StatusCode::CONFLICT, message, "ALREADY_DRAWN", false)
            }
            CoreError::Upstream(_) => Self::new(
                StatusCode::BAD_GATEWAY,
                message,
                "UPSTREAM_ERROR",
                true,
            ),
            CoreError::InvariantViolation(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "an internal invariant was violated".to_string(),
                "INVARIANT_VIOLATION",
                false,
            )
            .with_source(err.into()),
            CoreError::Storage(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "a storage error occurred".to_string(),
                "STORAGE_ERROR",
                true,
            )
            .with_source(err.into()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}
