//! Error types for the hash cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the hash cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Empty or invalid caller-supplied identifier, detected before any I/O
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Stored record violates the envelope contract
    #[error("Malformed record: field '{field}' {message}")]
    MalformedRecord {
        /// Wire name of the offending field
        field: &'static str,
        /// What was wrong with it
        message: String,
    },

    /// Failure reported by the underlying store
    #[error("Remote store failure: {0}")]
    RemoteStore(String),

    /// A single sweep entry that could not be processed
    #[error("Failed to sweep entry '{field}' of table '{table}': {source}")]
    SweepEntry {
        /// Physical table name
        table: String,
        /// Hash field being processed
        field: String,
        /// Underlying failure
        #[source]
        source: Box<CacheError>,
    },

    /// Sweep finished with one or more entry failures
    #[error("Sweep of table '{table}' failed with {} error(s)", errors.len())]
    SweepFailed {
        /// Physical table name
        table: String,
        /// Every failure encountered during the scan
        errors: Vec<CacheError>,
    },

    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Record not found (HTTP surface only; the service reports absence as `None`)
    #[error("Record not found: {0}")]
    NotFound(String),
}

impl CacheError {
    /// Shorthand for a `MalformedRecord` error.
    pub fn malformed(field: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            field,
            message: message.into(),
        }
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::RemoteStore(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Validation(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::MalformedRecord { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            CacheError::RemoteStore(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::SweepEntry { .. }
            | CacheError::SweepFailed { .. }
            | CacheError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            CacheError::SweepFailed { errors, .. } => Json(json!({
                "error": self.to_string(),
                "details": errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
            })),
            _ => Json(json!({
                "error": self.to_string()
            })),
        };

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the hash cache.
pub type Result<T> = std::result::Result<T, CacheError>;
