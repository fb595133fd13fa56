//! Error types for the cache adapters
//!
//! Provides the failure taxonomy shared by every adapter, using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for all cache adapters.
///
/// Every single-key operation fails with at most one of these kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Add was called on a live key
    #[error("Key `{0}` already exists")]
    AlreadyExists(String),

    /// The operation requires an existing, unexpired key
    #[error("Key `{0}` does not exist")]
    NonExistingKey(String),

    /// Delete was called on an absent key
    #[error("Key `{0}` not found")]
    NotFound(String),

    /// The stored value is not a byte sequence
    #[error("Value for key `{0}` is not a byte sequence")]
    InvalidData(String),

    /// The stored value does not decode as a 64-bit integer
    #[error("Value for key `{0}` could not be decoded as an integer")]
    Encoding(String),

    /// Increment or decrement called with initial < 0 or offset <= 0
    #[error("The range `{initial}` to `{offset}` is not supported")]
    InvalidRange { initial: i64, offset: i64 },

    /// A decrement would bring the value below zero
    #[error("Value for key `{0}` would drop below zero")]
    ValueBelowZero(String),

    /// Token mismatch or a transaction aborted by a concurrent write
    #[error("Key `{0}` was modified concurrently")]
    Conflict(String),

    /// The remote engine failed to answer a command
    #[error("Engine error: {0}")]
    Engine(String),

    /// Malformed request at the HTTP surface
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    // == Status Code ==
    /// HTTP status used when the error leaves the server.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CacheError::NonExistingKey(_) | CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::AlreadyExists(_) | CacheError::Conflict(_) => StatusCode::CONFLICT,
            CacheError::InvalidRange { .. } | CacheError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            CacheError::InvalidData(_)
            | CacheError::Encoding(_)
            | CacheError::ValueBelowZero(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CacheError::Engine(_) => StatusCode::BAD_GATEWAY,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string()
        }));

        (self.status_code(), body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
