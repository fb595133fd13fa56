//! Cached Item Module
//!
//! Defines the structure for individual cached items with TTL support.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::codec::fingerprint;

// == Cached Item ==
/// A stored value with its token and optional expiry.
#[derive(Debug, Clone)]
pub struct CachedItem {
    /// The stored bytes
    pub value: Vec<u8>,
    /// Fingerprint of `value`
    pub token: String,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl CachedItem {
    // == Constructor ==
    /// Creates an item, computing its token from the value.
    ///
    /// # Arguments
    /// * `value` - The bytes to store
    /// * `ttl` - TTL in seconds, 0 for no expiration
    pub fn new(value: Vec<u8>, ttl: i64) -> Self {
        let token = fingerprint(&value);
        Self {
            value,
            token,
            expires_at: expiry_for(ttl),
        }
    }

    // == Is Expired ==
    /// Checks if the item has expired.
    ///
    /// An item is expired once the current time is greater than or equal to
    /// its expiration time.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

    // == Size ==
    /// Number of bytes this item counts towards the size limit.
    pub fn size(&self) -> usize {
        self.value.len()
    }
}

// == Utility Functions ==
/// Expiration timestamp for a TTL in seconds. Non-positive TTLs never expire.
pub fn expiry_for(ttl: i64) -> Option<u64> {
    if ttl <= 0 {
        return None;
    }
    Some(current_timestamp_ms().saturating_add((ttl as u64).saturating_mul(1000)))
}

/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
