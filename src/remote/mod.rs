//! Remote Module
//!
//! Provides the remote-store adapter and the engines it can drive.
//!
//! # Engines
//! - `RedisEngine`: a blocking Redis connection
//! - `LocalEngine`: an in-process engine with the same optimistic-locking
//!   behaviour, shared between any number of connections

mod engine;
mod local;
mod redis_engine;
mod store;

pub use engine::{Commit, EngineError, EngineResult, Mutation, RemoteEngine};
pub use local::{LocalConnection, LocalEngine};
pub use redis_engine::RedisEngine;
pub use store::RemoteCache;
