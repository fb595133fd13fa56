//! Configuration Module
//!
//! Handles loading server configuration from environment variables and
//! constructing the configured cache adapter.

use std::env;
use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::cache::MemoryCache;
use crate::cacher::Cacher;
use crate::error::Result;
use crate::remote::{LocalEngine, RedisEngine, RemoteCache};

// == Backend ==
/// Which adapter the server fronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// In-process LRU cache
    Memory,
    /// Remote store (Redis, or the local engine when no URL is set)
    Remote,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Backend::Memory),
            "remote" | "redis" => Ok(Backend::Remote),
            other => Err(format!("unknown cache backend `{}`", other)),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Memory => write!(f, "memory"),
            Backend::Remote => write!(f, "remote"),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Adapter behind the server
    pub backend: Backend,
    /// Byte limit of the memory adapter, 0 = derived from process memory
    pub memory_limit: usize,
    /// Redis connection URL for the remote adapter
    pub redis_url: Option<String>,
    /// HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - `memory` or `remote` (default: memory)
    /// - `CACHE_MEMORY_LIMIT` - Memory adapter limit in bytes (default: 0, derived)
    /// - `REDIS_URL` - Redis URL for the remote adapter (default: unset)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backend: env::var("CACHE_BACKEND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.backend),
            memory_limit: env::var("CACHE_MEMORY_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.memory_limit),
            redis_url: env::var("REDIS_URL").ok().filter(|v| !v.trim().is_empty()),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            cleanup_interval: env::var("CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cleanup_interval),
        }
    }

    // == Build Cache ==
    /// Constructs the configured adapter.
    pub fn build_cache(&self) -> Result<Box<dyn Cacher + Send>> {
        match (self.backend, &self.redis_url) {
            (Backend::Memory, _) => Ok(Box::new(MemoryCache::new(self.memory_limit))),
            (Backend::Remote, Some(url)) => {
                let engine = RedisEngine::open(url)?;
                info!("Remote adapter connected to {}", url);
                Ok(Box::new(RemoteCache::new(engine)))
            }
            (Backend::Remote, None) => {
                info!("No REDIS_URL set, remote adapter uses the local engine");
                Ok(Box::new(RemoteCache::new(LocalEngine::new().connect())))
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Memory,
            memory_limit: 0,
            redis_url: None,
            server_port: 3000,
            cleanup_interval: 1,
        }
    }
}
