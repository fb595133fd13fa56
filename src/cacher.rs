//! Cache Contract Module
//!
//! The operation set every adapter implements with identical semantics.
//!
//! # TTL
//! - `ttl == 0`: the item never expires
//! - `ttl > 0`: the item expires `ttl` seconds from now
//! - `ttl < 0`: the write is replaced by a delete of the key

use std::collections::HashMap;

use crate::cache::CacheStats;
use crate::error::{CacheError, Result};

// == Cached Value ==
/// A value read from the cache together with its current token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    /// Stored bytes
    pub value: Vec<u8>,
    /// Fingerprint of `value`, used for compare-and-replace
    pub token: String,
}

// == Multi Get ==
/// Per-key results of [`Cacher::get_multi`], as parallel maps.
///
/// A key appears either in `values` and `tokens`, or in `errors`.
#[derive(Debug, Clone, Default)]
pub struct MultiGet {
    pub values: HashMap<String, Vec<u8>>,
    pub tokens: HashMap<String, String>,
    pub errors: HashMap<String, CacheError>,
}

impl MultiGet {
    /// Records the outcome of a single lookup.
    pub fn record(&mut self, key: &str, outcome: Result<Fetched>) {
        match outcome {
            Ok(fetched) => {
                self.values.insert(key.to_string(), fetched.value);
                self.tokens.insert(key.to_string(), fetched.token);
            }
            Err(err) => {
                self.errors.insert(key.to_string(), err);
            }
        }
    }
}

// == Cacher Trait ==
/// Uniform caching interface.
///
/// Methods take `&mut self`: adapters perform no internal locking, so shared
/// use across threads requires the caller to wrap the adapter in a mutex.
pub trait Cacher {
    /// Stores the value unless the key is present and unexpired.
    fn add(&mut self, key: &str, value: &[u8], ttl: i64) -> Result<()>;

    /// Stores the value unconditionally.
    fn set(&mut self, key: &str, value: &[u8], ttl: i64) -> Result<()>;

    /// Applies [`Cacher::set`] per entry. There is no cross-key atomicity.
    fn set_multi(
        &mut self,
        items: &HashMap<String, Vec<u8>>,
        ttl: i64,
    ) -> HashMap<String, Result<()>> {
        items
            .iter()
            .map(|(key, value)| (key.clone(), self.set(key, value, ttl)))
            .collect()
    }

    /// Stores the value only when the key is present and unexpired.
    fn replace(&mut self, key: &str, value: &[u8], ttl: i64) -> Result<()>;

    /// Stores the value only when `token` still matches the stored token.
    fn compare_and_replace(&mut self, token: &str, key: &str, value: &[u8], ttl: i64)
        -> Result<()>;

    /// Adds `offset` to a stored counter, seeding it with `initial` when absent.
    fn increment(&mut self, key: &str, initial: i64, offset: i64, ttl: i64) -> Result<()>;

    /// Subtracts `offset` from a stored counter, seeding it with `initial` when absent.
    fn decrement(&mut self, key: &str, initial: i64, offset: i64, ttl: i64) -> Result<()>;

    /// Removes the key.
    fn delete(&mut self, key: &str) -> Result<()>;

    /// Applies [`Cacher::delete`] per key.
    fn delete_multi(&mut self, keys: &[String]) -> HashMap<String, Result<()>> {
        keys.iter()
            .map(|key| (key.clone(), self.delete(key)))
            .collect()
    }

    /// Reads the value and its token.
    fn get(&mut self, key: &str) -> Result<Fetched>;

    /// Applies [`Cacher::get`] per key.
    fn get_multi(&mut self, keys: &[String]) -> MultiGet {
        let mut results = MultiGet::default();
        for key in keys {
            let outcome = self.get(key);
            results.record(key, outcome);
        }
        results
    }

    /// Removes every item.
    fn flush(&mut self) -> Result<()>;

    /// Updates the expiry of a live key without touching its value.
    fn touch(&mut self, key: &str, ttl: i64) -> Result<()>;

    /// Removes expired items ahead of access. Returns how many were removed.
    fn cleanup_expired(&mut self) -> Result<usize> {
        Ok(0)
    }

    /// Adapter statistics, when the adapter tracks them.
    fn stats(&self) -> Option<CacheStats> {
        None
    }

    /// Short adapter name for logs and health output.
    fn backend(&self) -> &'static str;
}

// == Counter Validation ==
/// Rejects counter arguments outside `initial >= 0` and `offset > 0`.
pub(crate) fn check_range(initial: i64, offset: i64) -> Result<()> {
    if initial < 0 || offset <= 0 {
        return Err(CacheError::InvalidRange { initial, offset });
    }
    Ok(())
}

// == Counter Arithmetic ==
/// Applies a signed offset to a stored counter.
///
/// Fails with `ValueBelowZero` when the result is negative and with
/// `InvalidRange` when it does not fit in 64 bits.
pub(crate) fn apply_offset(key: &str, current: i64, initial: i64, delta: i64) -> Result<i64> {
    let next = current.checked_add(delta).ok_or(CacheError::InvalidRange {
        initial,
        offset: delta.abs(),
    })?;
    if next < 0 {
        return Err(CacheError::ValueBelowZero(key.to_string()));
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range() {
        assert!(check_range(0, 1).is_ok());
        assert_eq!(
            check_range(-1, 1),
            Err(CacheError::InvalidRange {
                initial: -1,
                offset: 1
            })
        );
        assert!(check_range(0, 0).is_err());
    }

    #[test]
    fn test_apply_offset() {
        assert_eq!(apply_offset("k", 10, 0, -1), Ok(9));
        assert_eq!(
            apply_offset("k", 1, 0, -2),
            Err(CacheError::ValueBelowZero("k".into()))
        );
        assert!(matches!(
            apply_offset("k", i64::MAX, 0, 1),
            Err(CacheError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_multi_get_record() {
        let mut results = MultiGet::default();
        results.record(
            "a",
            Ok(Fetched {
                value: b"1".to_vec(),
                token: "t".into(),
            }),
        );
        results.record("b", Err(CacheError::NonExistingKey("b".into())));

        assert_eq!(results.values["a"], b"1".to_vec());
        assert_eq!(results.tokens["a"], "t");
        assert!(!results.errors.contains_key("a"));
        assert_eq!(results.errors["b"], CacheError::NonExistingKey("b".into()));
    }
}
