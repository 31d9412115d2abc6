//! Error types for mixmentor
//!
//! Two layers: `AnalysisError` covers the analysis pipeline (fatal errors
//! abort the job; warnings are collected on the report instead), and
//! `ApiError` maps failures onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Fatal analysis pipeline errors
///
/// Advisory observations (lossy source, DC offset, detected artifacts) are
/// never errors; they are collected as report warnings.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// File unreadable, unsupported, or sample rate undeterminable
    #[error("Decode error: {0}")]
    Decode(String),

    /// A required numeric capability (spectral transform, loudness meter,
    /// onset detector, resampler) is not registered in this environment.
    /// Distinct from a data problem.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A numeric backend failed while processing valid input
    #[error("Processing error: {0}")]
    Processing(String),

    /// IO error (result persistence, profile file access)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
