//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::HashMap;

use serde::Serialize;

use crate::cacher::{Fetched, MultiGet};
use crate::error::Result;

/// Response body for GET /get/:key
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value, lossily decoded as UTF-8
    pub value: String,
    /// Token for a later compare-and-replace
    pub token: String,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, fetched: Fetched) -> Self {
        Self {
            key: key.into(),
            value: String::from_utf8_lossy(&fetched.value).into_owned(),
            token: fetched.token,
        }
    }
}

/// Response body for successful single-key writes
#[derive(Debug, Clone, Serialize)]
pub struct WriteResponse {
    /// Success message
    pub message: String,
    /// The key that was written
    pub key: String,
}

impl WriteResponse {
    /// Creates a response such as "Key 'k' set successfully"
    pub fn new(key: impl Into<String>, action: &str) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' {} successfully", key, action),
            key,
        }
    }
}

/// Response body for operations that do not address a single key
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response body for POST /get_multi
#[derive(Debug, Clone, Default, Serialize)]
pub struct MultiGetResponse {
    pub values: HashMap<String, String>,
    pub tokens: HashMap<String, String>,
    /// Error message per failed key
    pub errors: HashMap<String, String>,
}

impl From<MultiGet> for MultiGetResponse {
    fn from(results: MultiGet) -> Self {
        Self {
            values: results
                .values
                .into_iter()
                .map(|(key, value)| (key, String::from_utf8_lossy(&value).into_owned()))
                .collect(),
            tokens: results.tokens,
            errors: results
                .errors
                .into_iter()
                .map(|(key, err)| (key, err.to_string()))
                .collect(),
        }
    }
}

/// Response body for POST /set_multi and POST /del_multi
///
/// Each key maps to `null` on success or to its error message.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResponse {
    pub results: HashMap<String, Option<String>>,
}

impl From<HashMap<String, Result<()>>> for BatchResponse {
    fn from(results: HashMap<String, Result<()>>) -> Self {
        Self {
            results: results
                .into_iter()
                .map(|(key, outcome)| (key, outcome.err().map(|err| err.to_string())))
                .collect(),
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Adapter name
    pub backend: String,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    pub size_bytes: usize,
    pub limit_bytes: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    pub fn new(backend: &str, stats: &crate::cache::CacheStats) -> Self {
        Self {
            backend: backend.to_string(),
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            expirations: stats.expirations,
            total_entries: stats.total_entries,
            size_bytes: stats.size_bytes,
            limit_bytes: stats.limit_bytes,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Adapter name
    pub backend: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(backend: &str) -> Self {
        Self {
            status: "healthy".to_string(),
            backend: backend.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
