//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    add_handler, cas_handler, decrement_handler, delete_handler, delete_multi_handler,
    flush_handler, get_handler, get_multi_handler, health_handler, increment_handler,
    replace_handler, set_handler, set_multi_handler, stats_handler, touch_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /set` - Store a key-value pair
/// - `POST /add` - Store only if the key is absent
/// - `POST /replace` - Store only if the key is present
/// - `POST /cas` - Store only if the token still matches
/// - `POST /incr`, `POST /decr` - Adjust a counter
/// - `POST /touch` - Update a key's expiry
/// - `POST /set_multi` - Store several pairs
/// - `GET /get/:key` - Retrieve a value and its token
/// - `POST /get_multi` - Retrieve several values
/// - `DELETE /del/:key` - Delete a key
/// - `POST /del_multi` - Delete several keys
/// - `POST /flush` - Remove every key
/// - `GET /stats` - Get cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/set", put(set_handler))
        .route("/add", post(add_handler))
        .route("/replace", post(replace_handler))
        .route("/cas", post(cas_handler))
        .route("/incr", post(increment_handler))
        .route("/decr", post(decrement_handler))
        .route("/touch", post(touch_handler))
        .route("/set_multi", post(set_multi_handler))
        .route("/get/:key", get(get_handler))
        .route("/get_multi", post(get_multi_handler))
        .route("/del/:key", delete(delete_handler))
        .route("/del_multi", post(delete_multi_handler))
        .route("/flush", post(flush_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
