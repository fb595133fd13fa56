//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.
//!
//! Adapters are synchronous and may block on network round trips, so every
//! call runs on the blocking pool while holding the shared cache lock.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::cacher::Cacher;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    BatchResponse, CasRequest, CounterRequest, GetResponse, HealthResponse, KeysRequest,
    MessageResponse, MultiGetResponse, SetMultiRequest, SetRequest, StatsResponse, TouchRequest,
    WriteResponse,
};

/// A cache adapter shared between handlers and background tasks.
pub type SharedCache = Arc<Mutex<Box<dyn Cacher + Send>>>;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Serialized access to the configured adapter
    pub cache: SharedCache,
}

impl AppState {
    /// Creates a new AppState around an adapter.
    pub fn new(cache: Box<dyn Cacher + Send>) -> Self {
        Self {
            cache: Arc::new(Mutex::new(cache)),
        }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.build_cache()?))
    }

    // == Run ==
    /// Runs `op` against the adapter on the blocking pool.
    pub async fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut (dyn Cacher + Send)) -> T + Send + 'static,
        T: Send + 'static,
    {
        let cache = Arc::clone(&self.cache);
        tokio::task::spawn_blocking(move || {
            let mut guard = cache.blocking_lock();
            op(&mut **guard)
        })
        .await
        .map_err(|err| CacheError::Internal(err.to_string()))
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair unconditionally.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<WriteResponse>> {
    req.validate()?;

    let SetRequest { key, value, ttl } = req;
    let stored = key.clone();
    state
        .run(move |cache| cache.set(&stored, value.as_bytes(), ttl))
        .await??;

    Ok(Json(WriteResponse::new(key, "set")))
}

/// Handler for POST /add
///
/// Stores a key-value pair only if the key is not live.
pub async fn add_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<WriteResponse>> {
    req.validate()?;

    let SetRequest { key, value, ttl } = req;
    let stored = key.clone();
    state
        .run(move |cache| cache.add(&stored, value.as_bytes(), ttl))
        .await??;

    Ok(Json(WriteResponse::new(key, "added")))
}

/// Handler for POST /replace
pub async fn replace_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<WriteResponse>> {
    req.validate()?;

    let SetRequest { key, value, ttl } = req;
    let stored = key.clone();
    state
        .run(move |cache| cache.replace(&stored, value.as_bytes(), ttl))
        .await??;

    Ok(Json(WriteResponse::new(key, "replaced")))
}

/// Handler for POST /cas
///
/// Replaces the value only if the supplied token still matches.
pub async fn cas_handler(
    State(state): State<AppState>,
    Json(req): Json<CasRequest>,
) -> Result<Json<WriteResponse>> {
    req.validate()?;

    let CasRequest {
        token,
        key,
        value,
        ttl,
    } = req;
    let stored = key.clone();
    state
        .run(move |cache| cache.compare_and_replace(&token, &stored, value.as_bytes(), ttl))
        .await??;

    Ok(Json(WriteResponse::new(key, "replaced")))
}

/// Handler for POST /incr
pub async fn increment_handler(
    State(state): State<AppState>,
    Json(req): Json<CounterRequest>,
) -> Result<Json<WriteResponse>> {
    req.validate()?;

    let CounterRequest {
        key,
        initial,
        offset,
        ttl,
    } = req;
    let stored = key.clone();
    state
        .run(move |cache| cache.increment(&stored, initial, offset, ttl))
        .await??;

    Ok(Json(WriteResponse::new(key, "incremented")))
}

/// Handler for POST /decr
pub async fn decrement_handler(
    State(state): State<AppState>,
    Json(req): Json<CounterRequest>,
) -> Result<Json<WriteResponse>> {
    req.validate()?;

    let CounterRequest {
        key,
        initial,
        offset,
        ttl,
    } = req;
    let stored = key.clone();
    state
        .run(move |cache| cache.decrement(&stored, initial, offset, ttl))
        .await??;

    Ok(Json(WriteResponse::new(key, "decremented")))
}

/// Handler for POST /touch
pub async fn touch_handler(
    State(state): State<AppState>,
    Json(req): Json<TouchRequest>,
) -> Result<Json<WriteResponse>> {
    req.validate()?;

    let TouchRequest { key, ttl } = req;
    let stored = key.clone();
    state.run(move |cache| cache.touch(&stored, ttl)).await??;

    Ok(Json(WriteResponse::new(key, "touched")))
}

/// Handler for POST /set_multi
pub async fn set_multi_handler(
    State(state): State<AppState>,
    Json(req): Json<SetMultiRequest>,
) -> Result<Json<BatchResponse>> {
    req.validate()?;

    let items: HashMap<String, Vec<u8>> = req
        .items
        .into_iter()
        .map(|(key, value)| (key, value.into_bytes()))
        .collect();
    let ttl = req.ttl;
    let results = state.run(move |cache| cache.set_multi(&items, ttl)).await?;

    Ok(Json(BatchResponse::from(results)))
}

/// Handler for GET /get/:key
///
/// Retrieves a value and its token.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let lookup = key.clone();
    let fetched = state.run(move |cache| cache.get(&lookup)).await??;

    Ok(Json(GetResponse::new(key, fetched)))
}

/// Handler for POST /get_multi
pub async fn get_multi_handler(
    State(state): State<AppState>,
    Json(req): Json<KeysRequest>,
) -> Result<Json<MultiGetResponse>> {
    req.validate()?;

    let results = state.run(move |cache| cache.get_multi(&req.keys)).await?;

    Ok(Json(MultiGetResponse::from(results)))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<WriteResponse>> {
    let target = key.clone();
    state.run(move |cache| cache.delete(&target)).await??;

    Ok(Json(WriteResponse::new(key, "deleted")))
}

/// Handler for POST /del_multi
pub async fn delete_multi_handler(
    State(state): State<AppState>,
    Json(req): Json<KeysRequest>,
) -> Result<Json<BatchResponse>> {
    req.validate()?;

    let results = state.run(move |cache| cache.delete_multi(&req.keys)).await?;

    Ok(Json(BatchResponse::from(results)))
}

/// Handler for POST /flush
pub async fn flush_handler(State(state): State<AppState>) -> Result<Json<MessageResponse>> {
    state.run(|cache| cache.flush()).await??;
    debug!("Cache flushed");

    Ok(Json(MessageResponse::new("Cache flushed successfully")))
}

/// Handler for GET /stats
///
/// Adapters without statistics report zeroed counters.
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let cache = state.cache.lock().await;
    let stats = cache.stats().unwrap_or_default();

    Ok(Json(StatsResponse::new(cache.backend(), &stats)))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let cache = state.cache.lock().await;
    Json(HealthResponse::healthy(cache.backend()))
}
