//! Memory Cache Module
//!
//! Main in-memory adapter combining HashMap storage with LRU tracking, byte-size
//! accounting and lazy TTL expiration.

use std::collections::HashMap;

use sysinfo::System;
use tracing::debug;

use super::entry::expiry_for;
use crate::cache::{CacheStats, CachedItem, LruTracker, DEFAULT_LIMIT_FRACTION, FALLBACK_LIMIT};
use crate::cacher::{apply_offset, check_range, Cacher, Fetched};
use crate::codec::{decode_int64, encode_int64};
use crate::error::{CacheError, Result};

// == Memory Cache ==
/// In-process cache bounded by the total byte length of its values.
///
/// Invariants:
/// - a key is in `lru` exactly when it is in `items`
/// - `size` equals the sum of the value lengths in `items`
#[derive(Debug)]
pub struct MemoryCache {
    /// Key-value storage
    pub(super) items: HashMap<String, CachedItem>,
    /// LRU access tracker
    lru: LruTracker,
    /// Running byte count of stored values
    size: usize,
    /// Size limit in bytes
    limit: usize,
    /// Performance statistics
    stats: CacheStats,
}

impl MemoryCache {
    // == Constructor ==
    /// Creates a new MemoryCache.
    ///
    /// # Arguments
    /// * `limit` - Maximum byte size of all stored values. `0` derives the
    ///   limit from 10% of the process's current memory usage; callers with
    ///   strict memory requirements should pass an explicit limit.
    pub fn new(limit: usize) -> Self {
        let limit = if limit == 0 { default_limit() } else { limit };
        debug!("Memory cache created with a limit of {} bytes", limit);

        Self {
            items: HashMap::new(),
            lru: LruTracker::new(),
            size: 0,
            limit,
            stats: CacheStats::new(),
        }
    }

    // == Accessors ==
    /// Configured size limit in bytes.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Sum of the value lengths of all stored items.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the current number of stored items, expired ones included.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Keys from least to most recently used.
    pub fn keys_by_recency(&self) -> Vec<String> {
        self.lru.iter().map(str::to_string).collect()
    }

    // == Exists ==
    /// Checks whether a key is live.
    ///
    /// An expired item is removed and reported absent. A live key is promoted
    /// to most recently used.
    fn exists(&mut self, key: &str) -> bool {
        let expired = match self.items.get(key) {
            Some(item) => item.is_expired(),
            None => return false,
        };

        if expired {
            self.remove(key);
            self.stats.record_expiration();
            return false;
        }

        self.lru.touch(key);
        true
    }

    // == Remove ==
    /// Drops a key from storage, recency tracking and the size counter.
    fn remove(&mut self, key: &str) -> Option<CachedItem> {
        let item = self.items.remove(key)?;
        self.lru.remove(key);
        self.size -= item.size();
        Some(item)
    }

    // == Evict ==
    /// Removes least recently used items until the size is within the limit.
    fn evict(&mut self) {
        while self.size > self.limit {
            let Some(key) = self.lru.evict_oldest() else {
                break;
            };
            if let Some(item) = self.items.remove(&key) {
                self.size -= item.size();
                self.stats.record_eviction();
                debug!("Evicted key '{}' ({} bytes)", key, item.size());
            }
        }
    }

    // == Counter Update ==
    /// Shared body of increment and decrement. `delta` carries the sign.
    fn offset_counter(&mut self, key: &str, initial: i64, delta: i64, ttl: i64) -> Result<()> {
        if !self.exists(key) {
            return self.set(key, &encode_int64(initial), ttl);
        }

        let current = self
            .items
            .get(key)
            .and_then(|item| decode_int64(&item.value))
            .ok_or_else(|| CacheError::Encoding(key.to_string()))?;

        let next = apply_offset(key, current, initial, delta)?;
        self.set(key, &encode_int64(next), ttl)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Cacher for MemoryCache {
    fn add(&mut self, key: &str, value: &[u8], ttl: i64) -> Result<()> {
        if self.exists(key) {
            return Err(CacheError::AlreadyExists(key.to_string()));
        }

        self.set(key, value, ttl)
    }

    fn set(&mut self, key: &str, value: &[u8], ttl: i64) -> Result<()> {
        if ttl < 0 {
            return self.delete(key);
        }

        let item = CachedItem::new(value.to_vec(), ttl);
        self.size += item.size();
        if let Some(previous) = self.items.insert(key.to_string(), item) {
            self.size -= previous.size();
        }
        self.lru.touch(key);
        self.evict();

        Ok(())
    }

    fn replace(&mut self, key: &str, value: &[u8], ttl: i64) -> Result<()> {
        if !self.exists(key) {
            return Err(CacheError::NonExistingKey(key.to_string()));
        }

        self.set(key, value, ttl)
    }

    fn compare_and_replace(
        &mut self,
        token: &str,
        key: &str,
        value: &[u8],
        ttl: i64,
    ) -> Result<()> {
        if !self.exists(key) {
            return Err(CacheError::NonExistingKey(key.to_string()));
        }

        let matches = self.items.get(key).is_some_and(|item| item.token == token);
        if !matches {
            return Err(CacheError::Conflict(key.to_string()));
        }

        self.set(key, value, ttl)
    }

    fn increment(&mut self, key: &str, initial: i64, offset: i64, ttl: i64) -> Result<()> {
        check_range(initial, offset)?;
        self.offset_counter(key, initial, offset, ttl)
    }

    fn decrement(&mut self, key: &str, initial: i64, offset: i64, ttl: i64) -> Result<()> {
        check_range(initial, offset)?;
        self.offset_counter(key, initial, -offset, ttl)
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        match self.remove(key) {
            Some(item) if item.is_expired() => {
                self.stats.record_expiration();
                Err(CacheError::NotFound(key.to_string()))
            }
            Some(_) => Ok(()),
            None => Err(CacheError::NotFound(key.to_string())),
        }
    }

    fn get(&mut self, key: &str) -> Result<Fetched> {
        if !self.exists(key) {
            self.stats.record_miss();
            return Err(CacheError::NonExistingKey(key.to_string()));
        }

        let item = self
            .items
            .get(key)
            .ok_or_else(|| CacheError::NonExistingKey(key.to_string()))?;
        self.stats.record_hit();

        Ok(Fetched {
            value: item.value.clone(),
            token: item.token.clone(),
        })
    }

    fn flush(&mut self) -> Result<()> {
        self.items.clear();
        self.lru.clear();
        self.size = 0;
        Ok(())
    }

    fn touch(&mut self, key: &str, ttl: i64) -> Result<()> {
        if !self.exists(key) {
            return Err(CacheError::NonExistingKey(key.to_string()));
        }

        if ttl < 0 {
            return self.delete(key);
        }

        if let Some(item) = self.items.get_mut(key) {
            item.expires_at = expiry_for(ttl);
        }
        Ok(())
    }

    fn cleanup_expired(&mut self) -> Result<usize> {
        let expired: Vec<String> = self
            .items
            .iter()
            .filter(|(_, item)| item.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove(key);
            self.stats.record_expiration();
        }

        Ok(expired.len())
    }

    fn stats(&self) -> Option<CacheStats> {
        let mut stats = self.stats.clone();
        stats.total_entries = self.items.len();
        stats.size_bytes = self.size;
        stats.limit_bytes = self.limit;
        Some(stats)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

// == Default Limit ==
/// 10% of this process's resident memory, or [`FALLBACK_LIMIT`] when the
/// process cannot be inspected.
fn default_limit() -> usize {
    let observed = sysinfo::get_current_pid().ok().and_then(|pid| {
        let mut system = System::new();
        system.refresh_process(pid);
        system.process(pid).map(|process| process.memory())
    });

    match observed {
        Some(bytes) if bytes > 0 => ((bytes as f64 * DEFAULT_LIMIT_FRACTION) as usize).max(1),
        _ => FALLBACK_LIMIT,
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    fn value_of(cache: &mut MemoryCache, key: &str) -> Option<Vec<u8>> {
        cache.get(key).ok().map(|fetched| fetched.value)
    }

    #[test]
    fn test_store_new() {
        let cache = MemoryCache::new(100);
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
        assert_eq!(cache.limit(), 100);
    }

    #[test]
    fn test_default_limit_is_positive() {
        let cache = MemoryCache::new(0);
        assert!(cache.limit() > 0);
    }

    #[test]
    fn test_set_and_get() {
        let mut cache = MemoryCache::new(1024);

        cache.set("key1", b"value1", 0).unwrap();
        let fetched = cache.get("key1").unwrap();

        assert_eq!(fetched.value, b"value1");
        assert_eq!(fetched.token, crate::codec::fingerprint(b"value1"));
        assert_eq!(cache.size(), 6);
    }

    #[test]
    fn test_get_nonexistent() {
        let mut cache = MemoryCache::new(1024);

        let result = cache.get("nonexistent");
        assert_eq!(result, Err(CacheError::NonExistingKey("nonexistent".into())));
    }

    #[test]
    fn test_overwrite_keeps_size_accurate() {
        let mut cache = MemoryCache::new(1024);

        cache.set("key1", b"value1", 0).unwrap();
        cache.set("key1", b"v2", 0).unwrap();

        assert_eq!(value_of(&mut cache, "key1"), Some(b"v2".to_vec()));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.size(), 2);
    }

    #[test]
    fn test_add_first_writer_wins() {
        let mut cache = MemoryCache::new(1024);

        cache.add("key1", b"value1", 0).unwrap();
        assert_eq!(
            cache.add("key1", b"value2", 0),
            Err(CacheError::AlreadyExists("key1".into()))
        );
        assert_eq!(value_of(&mut cache, "key1"), Some(b"value1".to_vec()));
    }

    #[test]
    fn test_add_over_expired_item() {
        let mut cache = MemoryCache::new(1024);

        cache.set("key1", b"old", 1).unwrap();
        sleep(Duration::from_millis(1100));

        cache.add("key1", b"new", 0).unwrap();
        assert_eq!(value_of(&mut cache, "key1"), Some(b"new".to_vec()));
    }

    #[test]
    fn test_replace() {
        let mut cache = MemoryCache::new(1024);

        assert_eq!(
            cache.replace("key1", b"value1", 0),
            Err(CacheError::NonExistingKey("key1".into()))
        );

        cache.set("key1", b"value1", 0).unwrap();
        cache.replace("key1", b"value2", 0).unwrap();
        assert_eq!(value_of(&mut cache, "key1"), Some(b"value2".to_vec()));
    }

    #[test]
    fn test_compare_and_replace() {
        let mut cache = MemoryCache::new(1024);

        cache.set("key1", b"hello world", 0).unwrap();
        let token = cache.get("key1").unwrap().token;

        let stale = format!("{}X", token);
        assert_eq!(
            cache.compare_and_replace(&stale, "key1", b"replacement1", 0),
            Err(CacheError::Conflict("key1".into()))
        );
        assert_eq!(value_of(&mut cache, "key1"), Some(b"hello world".to_vec()));

        cache
            .compare_and_replace(&token, "key1", b"replacement2", 0)
            .unwrap();
        assert_eq!(value_of(&mut cache, "key1"), Some(b"replacement2".to_vec()));

        assert_eq!(
            cache.compare_and_replace(&token, "missing", b"x", 0),
            Err(CacheError::NonExistingKey("missing".into()))
        );
    }

    #[test]
    fn test_token_survives_rewrite_of_same_content() {
        let mut cache = MemoryCache::new(1024);

        cache.set("key1", b"a", 0).unwrap();
        let first = cache.get("key1").unwrap().token;
        cache.set("key1", b"a", 0).unwrap();
        let second = cache.get("key1").unwrap().token;
        cache.set("key1", b"b", 0).unwrap();
        let third = cache.get("key1").unwrap().token;

        assert_eq!(first, second);
        assert_ne!(first, third);
    }

    #[test]
    fn test_increment() {
        let mut cache = MemoryCache::new(1024);

        cache.increment("key1", 0, 1, 0).unwrap();
        assert_eq!(value_of(&mut cache, "key1"), Some(b"0".to_vec()));

        cache.increment("key1", 0, 1, 0).unwrap();
        assert_eq!(value_of(&mut cache, "key1"), Some(b"1".to_vec()));

        cache.set("string", b"value", 0).unwrap();
        assert_eq!(
            cache.increment("string", 0, 1, 0),
            Err(CacheError::Encoding("string".into()))
        );

        assert!(matches!(
            cache.increment("key2", 0, 0, 0),
            Err(CacheError::InvalidRange { .. })
        ));
        assert!(matches!(
            cache.increment("key3", -1, 1, 0),
            Err(CacheError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_decrement() {
        let mut cache = MemoryCache::new(1024);

        cache.decrement("key1", 10, 1, 0).unwrap();
        assert_eq!(value_of(&mut cache, "key1"), Some(b"10".to_vec()));

        cache.decrement("key1", 10, 1, 0).unwrap();
        assert_eq!(value_of(&mut cache, "key1"), Some(b"9".to_vec()));

        assert_eq!(
            cache.decrement("key1", 10, 10, 0),
            Err(CacheError::ValueBelowZero("key1".into()))
        );
        assert_eq!(value_of(&mut cache, "key1"), Some(b"9".to_vec()));
    }

    #[test]
    fn test_delete() {
        let mut cache = MemoryCache::new(1024);

        cache.set("key1", b"value1", 0).unwrap();
        cache.delete("key1").unwrap();

        assert!(cache.is_empty());
        assert_eq!(cache.size(), 0);
        assert_eq!(
            cache.delete("key1"),
            Err(CacheError::NotFound("key1".into()))
        );
    }

    #[test]
    fn test_negative_ttl_deletes() {
        let mut cache = MemoryCache::new(1024);

        cache.set("key1", b"value1", 0).unwrap();
        cache.set("key1", b"value1", -1).unwrap();

        assert!(cache.get("key1").is_err());
        assert_eq!(
            cache.set("absent", b"v", -1),
            Err(CacheError::NotFound("absent".into()))
        );
    }

    #[test]
    fn test_ttl_expiration() {
        let mut cache = MemoryCache::new(1024);

        cache.set("key1", b"value1", 1).unwrap();
        assert!(cache.get("key1").is_ok());

        sleep(Duration::from_millis(1100));

        assert_eq!(
            cache.get("key1"),
            Err(CacheError::NonExistingKey("key1".into()))
        );
        assert!(cache.is_empty());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_touch() {
        let mut cache = MemoryCache::new(1024);

        assert_eq!(
            cache.touch("key1", 10),
            Err(CacheError::NonExistingKey("key1".into()))
        );

        cache.set("key1", b"value1", 1).unwrap();
        let token = cache.get("key1").unwrap().token;
        cache.touch("key1", 0).unwrap();

        sleep(Duration::from_millis(1100));

        let fetched = cache.get("key1").unwrap();
        assert_eq!(fetched.value, b"value1");
        assert_eq!(fetched.token, token);

        cache.touch("key1", -1).unwrap();
        assert!(cache.get("key1").is_err());
    }

    #[test]
    fn test_flush() {
        let mut cache = MemoryCache::new(1024);

        cache.set("key1", b"value1", 0).unwrap();
        cache.set("key2", b"value2", 0).unwrap();
        cache.flush().unwrap();

        assert!(cache.is_empty());
        assert_eq!(cache.size(), 0);
        assert!(cache.keys_by_recency().is_empty());

        let keys = ["key1".to_string(), "key2".to_string()];
        let results = cache.get_multi(&keys);
        assert!(results.values.is_empty());
        for key in &keys {
            assert_eq!(results.errors[key], CacheError::NonExistingKey(key.clone()));
        }
    }

    #[test]
    fn test_limit_eviction_order() {
        let mut cache = MemoryCache::new(30);

        for i in 1..=5 {
            cache
                .add(&format!("key{i}"), format!("value{i}").as_bytes(), 0)
                .unwrap();
        }
        assert_eq!(cache.size(), 30);

        cache.add("key6", b"value6", 0).unwrap();
        assert!(cache.get("key1").is_err());

        cache.get("key2").unwrap();
        cache.add("key7", b"value7", 0).unwrap();

        assert!(cache.get("key3").is_err());
        assert!(cache.get("key2").is_ok());
        assert_eq!(cache.size(), 30);
    }

    #[test]
    fn test_limit_after_delete() {
        let mut cache = MemoryCache::new(30);

        for i in 1..=5 {
            cache
                .add(&format!("key{i}"), format!("value{i}").as_bytes(), 0)
                .unwrap();
        }
        cache.add("key6", b"value6", 0).unwrap();

        cache.delete("key3").unwrap();
        cache.add("key7", b"value7", 0).unwrap();
        assert!(cache.get("key2").is_ok());

        cache.add("key8", b"value8", 0).unwrap();
        assert!(cache.get("key4").is_err());

        cache.add("key9", b"value9", 0).unwrap();
        assert!(cache.get("key5").is_err());
    }

    #[test]
    fn test_oversized_value_is_evicted() {
        let mut cache = MemoryCache::new(4);

        cache.set("small", b"ab", 0).unwrap();
        cache.set("big", b"abcdefgh", 0).unwrap();

        assert!(cache.is_empty());
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.stats().unwrap().evictions, 2);
    }

    #[test]
    fn test_cleanup_expired() {
        let mut cache = MemoryCache::new(1024);

        cache.set("key1", b"value1", 1).unwrap();
        cache.set("key2", b"value2", 10).unwrap();

        sleep(Duration::from_millis(1100));

        assert_eq!(cache.cleanup_expired().unwrap(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.size(), 6);
        assert!(cache.get("key2").is_ok());
    }

    #[test]
    fn test_stats() {
        let mut cache = MemoryCache::new(1024);

        cache.set("key1", b"value1", 0).unwrap();
        cache.get("key1").unwrap();
        let _ = cache.get("nonexistent");

        let stats = cache.stats().unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.size_bytes, 6);
        assert_eq!(stats.limit_bytes, 1024);
    }

    #[test]
    fn test_multi_operations() {
        let mut cache = MemoryCache::new(1024);

        let items: HashMap<String, Vec<u8>> = [
            ("item1".to_string(), encode_int64(1)),
            ("item2".to_string(), b"string".to_vec()),
        ]
        .into_iter()
        .collect();
        let results = cache.set_multi(&items, 0);
        assert!(results.values().all(|r| r.is_ok()));
        cache.set("key1", b"value1", 0).unwrap();

        let keys = vec!["item1".to_string(), "item2".to_string()];
        let fetched = cache.get_multi(&keys);
        assert_eq!(decode_int64(&fetched.values["item1"]), Some(1));
        assert_eq!(fetched.values["item2"], b"string");

        let deleted = cache.delete_multi(&[
            "item1".to_string(),
            "item2".to_string(),
            "missing".to_string(),
        ]);
        assert!(deleted["item1"].is_ok());
        assert!(deleted["item2"].is_ok());
        assert_eq!(deleted["missing"], Err(CacheError::NotFound("missing".into())));
        assert_eq!(value_of(&mut cache, "key1"), Some(b"value1".to_vec()));
    }
}
