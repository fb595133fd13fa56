//! Cacher - a uniform caching interface
//!
//! One contract ([`Cacher`]) with two adapters: an in-process cache bounded by
//! value bytes with LRU eviction ([`MemoryCache`]), and a remote-store adapter
//! that emulates compare-and-swap with optimistic transactions
//! ([`RemoteCache`]). An axum server exposes the configured adapter over HTTP.

pub mod api;
pub mod cache;
pub mod cacher;
pub mod codec;
pub mod config;
pub mod error;
pub mod models;
pub mod remote;
pub mod tasks;

pub use api::{create_router, AppState, SharedCache};
pub use cache::{CacheStats, MemoryCache};
pub use cacher::{Cacher, Fetched, MultiGet};
pub use config::{Backend, Config};
pub use error::{CacheError, Result};
pub use remote::{LocalEngine, RedisEngine, RemoteCache, RemoteEngine};
pub use tasks::spawn_cleanup_task;
