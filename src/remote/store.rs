//! Remote Cache Module
//!
//! Adapter translating the cache contract onto a remote engine.
//!
//! Check-then-act operations (add, replace, compare-and-replace, increment and
//! decrement) run as an optimistic lock: watch the key, evaluate the
//! precondition, then commit the write in a transaction that the engine
//! discards if the key changed in between. A discarded transaction surfaces as
//! `Conflict` and is never retried here.

use tracing::{debug, warn};

use super::engine::{Commit, EngineError, Mutation, RemoteEngine};
use crate::cacher::{apply_offset, check_range, Cacher, Fetched, MultiGet};
use crate::codec::{decode_int64, encode_int64, fingerprint};
use crate::error::{CacheError, Result};

// == Remote Cache ==
pub struct RemoteCache<E: RemoteEngine> {
    engine: E,
}

impl<E: RemoteEngine> RemoteCache<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    // == Primitive Helpers ==
    fn exists(&mut self, key: &str) -> Result<bool> {
        Ok(self.engine.exists(key)?)
    }

    /// Reads raw bytes, mapping non-string values to `InvalidData`.
    fn fetch(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        self.engine.get(key).map_err(|err| match err {
            EngineError::WrongType => CacheError::InvalidData(key.to_string()),
            other => other.into(),
        })
    }

    // == Optimistic Lock ==
    /// Watches `key`, lets `plan` evaluate the precondition and decide the
    /// writes, then commits them conditionally on the key being unchanged.
    ///
    /// The watch is always released, whatever the outcome.
    fn optimistic<F>(&mut self, key: &str, plan: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<Vec<Mutation>>,
    {
        self.engine.watch(key)?;
        debug!("Watching key '{}'", key);

        let outcome = plan(self).and_then(|mutations| self.commit(key, &mutations));
        let released = self.engine.unwatch();

        outcome?;
        released?;
        Ok(())
    }

    fn commit(&mut self, key: &str, mutations: &[Mutation]) -> Result<()> {
        match self.engine.exec(mutations)? {
            Commit::Applied => Ok(()),
            Commit::Aborted => {
                warn!("Transaction on key '{}' aborted: key modified concurrently", key);
                Err(CacheError::Conflict(key.to_string()))
            }
        }
    }

    // == Counter Update ==
    fn offset_counter(&mut self, key: &str, initial: i64, delta: i64, ttl: i64) -> Result<()> {
        self.optimistic(key, |cache| {
            let Some(stored) = cache.fetch(key)? else {
                return Ok(vec![write(key, encode_int64(initial), ttl)]);
            };

            let current =
                decode_int64(&stored).ok_or_else(|| CacheError::Encoding(key.to_string()))?;
            let next = apply_offset(key, current, initial, delta)?;
            Ok(vec![write(key, encode_int64(next), ttl)])
        })
    }
}

// == Mutation Builder ==
/// The transactional form of a set: negative TTLs become a delete.
fn write(key: &str, value: Vec<u8>, ttl: i64) -> Mutation {
    if ttl < 0 {
        Mutation::Delete {
            key: key.to_string(),
        }
    } else {
        Mutation::Set {
            key: key.to_string(),
            value,
            ttl: ttl as u64,
        }
    }
}

impl<E: RemoteEngine> Cacher for RemoteCache<E> {
    fn add(&mut self, key: &str, value: &[u8], ttl: i64) -> Result<()> {
        self.optimistic(key, |cache| {
            if cache.exists(key)? {
                return Err(CacheError::AlreadyExists(key.to_string()));
            }
            if ttl < 0 {
                return Err(CacheError::NotFound(key.to_string()));
            }
            Ok(vec![write(key, value.to_vec(), ttl)])
        })
    }

    fn set(&mut self, key: &str, value: &[u8], ttl: i64) -> Result<()> {
        match ttl {
            0 => self.engine.set(key, value)?,
            ttl if ttl > 0 => self.engine.set_with_expiry(key, value, ttl as u64)?,
            _ => return self.delete(key),
        }
        Ok(())
    }

    fn replace(&mut self, key: &str, value: &[u8], ttl: i64) -> Result<()> {
        self.optimistic(key, |cache| {
            if !cache.exists(key)? {
                return Err(CacheError::NonExistingKey(key.to_string()));
            }
            Ok(vec![write(key, value.to_vec(), ttl)])
        })
    }

    fn compare_and_replace(
        &mut self,
        token: &str,
        key: &str,
        value: &[u8],
        ttl: i64,
    ) -> Result<()> {
        self.optimistic(key, |cache| {
            let stored = cache
                .fetch(key)?
                .ok_or_else(|| CacheError::NonExistingKey(key.to_string()))?;
            if fingerprint(&stored) != token {
                return Err(CacheError::Conflict(key.to_string()));
            }
            Ok(vec![write(key, value.to_vec(), ttl)])
        })
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
        if self.engine.delete(key)? {
            Ok(())
        } else {
            Err(CacheError::NotFound(key.to_string()))
        }
    }

    fn get(&mut self, key: &str) -> Result<Fetched> {
        let value = self
            .fetch(key)?
            .ok_or_else(|| CacheError::NonExistingKey(key.to_string()))?;
        let token = fingerprint(&value);
        Ok(Fetched { value, token })
    }

    fn get_multi(&mut self, keys: &[String]) -> MultiGet {
        let mut results = MultiGet::default();

        let values = match self.engine.get_many(keys) {
            Ok(values) => values,
            Err(err) => {
                let err = CacheError::from(err);
                for key in keys {
                    results.errors.insert(key.clone(), err.clone());
                }
                return results;
            }
        };

        for (key, value) in keys.iter().zip(values) {
            let outcome = value
                .map(|value| Fetched {
                    token: fingerprint(&value),
                    value,
                })
                .ok_or_else(|| CacheError::NonExistingKey(key.clone()));
            results.record(key, outcome);
        }
        results
    }

    fn flush(&mut self) -> Result<()> {
        self.engine.flush()?;
        Ok(())
    }

    fn touch(&mut self, key: &str, ttl: i64) -> Result<()> {
        if !self.exists(key)? {
            return Err(CacheError::NonExistingKey(key.to_string()));
        }

        // A key that vanished after the existence check was never touchable
        if ttl < 0 {
            return match self.engine.delete(key)? {
                true => Ok(()),
                false => Err(CacheError::NonExistingKey(key.to_string())),
            };
        }

        if !self.engine.expire(key, ttl as u64)? {
            return Err(CacheError::NonExistingKey(key.to_string()));
        }
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "remote"
    }
}
