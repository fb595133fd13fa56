//! Cache Module
//!
//! Provides the in-memory adapter: byte-size bounded storage with TTL
//! expiration and LRU eviction.

mod entry;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use entry::{current_timestamp_ms, CachedItem};
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::MemoryCache;

// == Public Constants ==
/// Fraction of the process's memory used as the default size limit
pub const DEFAULT_LIMIT_FRACTION: f64 = 0.1;

/// Size limit used when the process's memory cannot be inspected
pub const FALLBACK_LIMIT: usize = 64 * 1024 * 1024; // 64 MB
