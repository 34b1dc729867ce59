//! API error types and response formatting.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use letterbox::IngestError;

/// API error type that converts to appropriate HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed body, missing signature fields, or a denied source
    /// creation.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Signature verification failed.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Store failure or pipeline timeout.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match &err {
            IngestError::Parse(_)
            | IngestError::MissingSignature
            | IngestError::SourceLimit { .. } => ApiError::BadRequest(err.to_string()),
            IngestError::InvalidSignature => ApiError::Forbidden("Invalid signature".to_string()),
            IngestError::Store(_) | IngestError::Timeout(_) => ApiError::Internal(err.to_string()),
        }
    }
}

/// JSON error response body.
#[derive(Debug, Clone, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}
