/// Unified error types for the user store service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Service-level error type
///
/// Identity operations never surface these to callers: they report failures
/// through the integer error codes of their responses. `StoreError` covers
/// startup problems and the few faults that happen around a call.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The configured users file or schema file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The request did not finish before its deadline
    #[error("Request deadline exceeded after {0:?}")]
    DeadlineExceeded(std::time::Duration),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            StoreError::DeadlineExceeded(_) => (
                StatusCode::GATEWAY_TIMEOUT,
                "DeadlineExceeded",
                self.to_string(),
            ),
            StoreError::Config(_) | StoreError::Json(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
            ),
            StoreError::Io(_) | StoreError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for service operations
pub type StoreResult<T> = Result<T, StoreError>;
