//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("invalid event: {0}")]
    Validation(#[from] crate::event::ValidationError),

    #[error("malformed request body: {0}")]
    Parse(#[from] crate::event::ParseError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // Server errors (5xx)
    #[error("broker error: {0}")]
    Broker(#[from] crate::broker::BrokerError),

    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 422 Unprocessable Entity
            AppError::Validation(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                Some(e.to_string()),
            ),

            // 400 Bad Request
            AppError::Parse(_) => (StatusCode::BAD_REQUEST, "malformed_request", None),
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            // 500 Internal Server Error (enqueue failure: spec mandates 500, not 503 -- the
            // queue is this service's own dependency, not a client-visible degraded mode)
            AppError::Broker(e) => {
                tracing::error!(error = %e, "broker_error");
                (StatusCode::INTERNAL_SERVER_ERROR, "enqueue_failed", None)
            }
            AppError::Store(e) => {
                tracing::error!(error = %e, "store_error");
                (StatusCode::INTERNAL_SERVER_ERROR, "store_error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal_error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Config(e) => {
                tracing::error!(error = %e, "config_error");
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
