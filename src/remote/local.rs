//! Local Engine Module
//!
//! An in-process engine speaking the same primitives as Redis, including
//! WATCH-style optimistic locking. Connections opened from one engine share a
//! keyspace, so concurrent clients can be reproduced deterministically.
//!
//! Watches are tracked with per-key version counters: every write bumps the
//! key's version, and a transaction commits only if every watched key still
//! has the version it had when it was watched.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use super::engine::{Commit, EngineError, EngineResult, Mutation, RemoteEngine};

// == Stored Value ==
#[derive(Debug, Clone)]
enum Stored {
    Bytes(Vec<u8>),
    List(Vec<Vec<u8>>),
}

#[derive(Debug, Clone)]
struct Slot {
    value: Stored,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

// == Keyspace ==
#[derive(Debug, Default)]
struct Keyspace {
    slots: HashMap<String, Slot>,
    /// Versions survive deletion so a watch on a removed key still conflicts
    versions: HashMap<String, u64>,
}

impl Keyspace {
    fn version(&self, key: &str) -> u64 {
        self.versions.get(key).copied().unwrap_or(0)
    }

    fn bump(&mut self, key: &str) {
        *self.versions.entry(key.to_string()).or_insert(0) += 1;
    }

    /// Live slot for a key, dropping it first if it has expired.
    fn live(&mut self, key: &str) -> Option<&mut Slot> {
        let now = Instant::now();
        if self.slots.get(key).is_some_and(|slot| slot.is_expired(now)) {
            self.slots.remove(key);
            self.bump(key);
        }
        self.slots.get_mut(key)
    }

    fn write(&mut self, key: &str, value: Stored, expires_at: Option<Instant>) {
        self.slots
            .insert(key.to_string(), Slot { value, expires_at });
        self.bump(key);
    }

    fn remove(&mut self, key: &str) -> bool {
        let existed = self.live(key).is_some();
        if existed {
            self.slots.remove(key);
            self.bump(key);
        }
        existed
    }
}

/// Deadline `ttl` seconds from now; 0 never expires.
///
/// TTLs past the range of `Instant` are rejected the way Redis rejects
/// out-of-range expire times.
fn deadline(ttl: u64) -> EngineResult<Option<Instant>> {
    if ttl == 0 {
        return Ok(None);
    }
    Instant::now()
        .checked_add(Duration::from_secs(ttl))
        .map(Some)
        .ok_or_else(|| EngineError::Transport(format!("invalid expire time `{}`", ttl)))
}

// == Local Engine ==
/// Shared keyspace handed out to [`LocalConnection`]s.
#[derive(Debug, Clone, Default)]
pub struct LocalEngine {
    keyspace: Arc<Mutex<Keyspace>>,
}

impl LocalEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new client connection with its own watch set.
    pub fn connect(&self) -> LocalConnection {
        LocalConnection {
            keyspace: Arc::clone(&self.keyspace),
            watched: HashMap::new(),
        }
    }
}

// == Local Connection ==
#[derive(Debug)]
pub struct LocalConnection {
    keyspace: Arc<Mutex<Keyspace>>,
    /// Watched keys and their versions at watch time
    watched: HashMap<String, u64>,
}

impl LocalConnection {
    /// Stores a list value under `key`, replacing whatever was there.
    ///
    /// Lists are not byte strings, so string reads of the key fail.
    pub fn push_list(&mut self, key: &str, items: Vec<Vec<u8>>) {
        self.keyspace.lock().write(key, Stored::List(items), None);
    }

    /// Number of keys this connection is watching.
    pub fn watched_len(&self) -> usize {
        self.watched.len()
    }
}

impl RemoteEngine for LocalConnection {
    fn set(&mut self, key: &str, value: &[u8]) -> EngineResult<()> {
        self.keyspace
            .lock()
            .write(key, Stored::Bytes(value.to_vec()), None);
        Ok(())
    }

    fn set_with_expiry(&mut self, key: &str, value: &[u8], ttl: u64) -> EngineResult<()> {
        if ttl == 0 {
            return Err(EngineError::Transport(
                "invalid expire time in 'setex' command".to_string(),
            ));
        }
        let expires_at = deadline(ttl)?;
        self.keyspace
            .lock()
            .write(key, Stored::Bytes(value.to_vec()), expires_at);
        Ok(())
    }

    fn get(&mut self, key: &str) -> EngineResult<Option<Vec<u8>>> {
        let mut keyspace = self.keyspace.lock();
        match keyspace.live(key).map(|slot| &slot.value) {
            None => Ok(None),
            Some(Stored::Bytes(bytes)) => Ok(Some(bytes.clone())),
            Some(Stored::List(_)) => Err(EngineError::WrongType),
        }
    }

    fn get_many(&mut self, keys: &[String]) -> EngineResult<Vec<Option<Vec<u8>>>> {
        let mut keyspace = self.keyspace.lock();
        Ok(keys
            .iter()
            .map(|key| match keyspace.live(key).map(|slot| &slot.value) {
                Some(Stored::Bytes(bytes)) => Some(bytes.clone()),
                _ => None,
            })
            .collect())
    }

    fn delete(&mut self, key: &str) -> EngineResult<bool> {
        Ok(self.keyspace.lock().remove(key))
    }

    fn exists(&mut self, key: &str) -> EngineResult<bool> {
        Ok(self.keyspace.lock().live(key).is_some())
    }

    fn expire(&mut self, key: &str, ttl: u64) -> EngineResult<bool> {
        let expires_at = deadline(ttl)?;
        let mut keyspace = self.keyspace.lock();
        let Some(slot) = keyspace.live(key) else {
            return Ok(false);
        };
        slot.expires_at = expires_at;
        keyspace.bump(key);
        Ok(true)
    }

    fn flush(&mut self) -> EngineResult<()> {
        let mut keyspace = self.keyspace.lock();
        let keys: Vec<String> = keyspace.slots.keys().cloned().collect();
        keyspace.slots.clear();
        for key in keys {
            keyspace.bump(&key);
        }
        Ok(())
    }

    fn watch(&mut self, key: &str) -> EngineResult<()> {
        let mut keyspace = self.keyspace.lock();
        keyspace.live(key);
        let version = keyspace.version(key);
        self.watched.entry(key.to_string()).or_insert(version);
        Ok(())
    }

    fn unwatch(&mut self) -> EngineResult<()> {
        self.watched.clear();
        Ok(())
    }

    fn exec(&mut self, mutations: &[Mutation]) -> EngineResult<Commit> {
        let watched = std::mem::take(&mut self.watched);
        let mut keyspace = self.keyspace.lock();

        let changed = watched.iter().find(|(key, version)| {
            keyspace.live(key);
            keyspace.version(key) != **version
        });
        if let Some((key, _)) = changed {
            debug!("Transaction discarded: watched key '{}' changed", key);
            return Ok(Commit::Aborted);
        }

        // Reject the whole transaction before applying any of it
        let deadlines = mutations
            .iter()
            .map(|mutation| match mutation {
                Mutation::Set { ttl, .. } => deadline(*ttl),
                Mutation::Delete { .. } => Ok(None),
            })
            .collect::<EngineResult<Vec<_>>>()?;

        for (mutation, expires_at) in mutations.iter().zip(deadlines) {
            match mutation {
                Mutation::Set { key, value, .. } => {
                    keyspace.write(key, Stored::Bytes(value.clone()), expires_at);
                }
                Mutation::Delete { key } => {
                    keyspace.remove(key);
                }
            }
        }
        Ok(Commit::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_connections_share_keyspace() {
        let engine = LocalEngine::new();
        let mut first = engine.connect();
        let mut second = engine.connect();

        first.set("key1", b"value1").unwrap();
        assert_eq!(second.get("key1").unwrap(), Some(b"value1".to_vec()));
    }

    #[test]
    fn test_exec_without_conflict() {
        let engine = LocalEngine::new();
        let mut conn = engine.connect();

        conn.set("key1", b"value1").unwrap();
        conn.watch("key1").unwrap();
        let outcome = conn
            .exec(&[Mutation::Set {
                key: "key1".into(),
                value: b"value2".to_vec(),
                ttl: 0,
            }])
            .unwrap();

        assert_eq!(outcome, Commit::Applied);
        assert_eq!(conn.get("key1").unwrap(), Some(b"value2".to_vec()));
        assert_eq!(conn.watched_len(), 0);
    }

    #[test]
    fn test_exec_aborts_after_concurrent_write() {
        let engine = LocalEngine::new();
        let mut first = engine.connect();
        let mut second = engine.connect();

        first.set("key1", b"value1").unwrap();
        first.watch("key1").unwrap();
        second.set("key1", b"other").unwrap();

        let outcome = first
            .exec(&[Mutation::Set {
                key: "key1".into(),
                value: b"mine".to_vec(),
                ttl: 0,
            }])
            .unwrap();

        assert_eq!(outcome, Commit::Aborted);
        assert_eq!(first.get("key1").unwrap(), Some(b"other".to_vec()));
    }

    #[test]
    fn test_watch_on_absent_key_conflicts_with_creation() {
        let engine = LocalEngine::new();
        let mut first = engine.connect();
        let mut second = engine.connect();

        first.watch("fresh").unwrap();
        second.set("fresh", b"1").unwrap();

        let outcome = first
            .exec(&[Mutation::Set {
                key: "fresh".into(),
                value: b"0".to_vec(),
                ttl: 0,
            }])
            .unwrap();
        assert_eq!(outcome, Commit::Aborted);
    }

    #[test]
    fn test_unwatch_releases_conflicts() {
        let engine = LocalEngine::new();
        let mut first = engine.connect();
        let mut second = engine.connect();

        first.watch("key1").unwrap();
        first.unwatch().unwrap();
        second.set("key1", b"other").unwrap();

        assert_eq!(first.exec(&[]).unwrap(), Commit::Applied);
    }

    #[test]
    fn test_flush_invalidates_watches() {
        let engine = LocalEngine::new();
        let mut first = engine.connect();
        let mut second = engine.connect();

        first.set("key1", b"v").unwrap();
        first.watch("key1").unwrap();
        second.flush().unwrap();

        assert_eq!(first.exec(&[]).unwrap(), Commit::Aborted);
        assert!(!first.exists("key1").unwrap());
    }

    #[test]
    fn test_expiry() {
        let engine = LocalEngine::new();
        let mut conn = engine.connect();

        conn.set_with_expiry("key1", b"v", 1).unwrap();
        conn.set("key2", b"v").unwrap();
        assert!(conn.expire("key2", 1).unwrap());
        assert!(conn.expire("key2", 0).unwrap());
        assert!(!conn.expire("missing", 1).unwrap());

        sleep(Duration::from_millis(1100));

        assert_eq!(conn.get("key1").unwrap(), None);
        assert_eq!(conn.get("key2").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_out_of_range_expiry_is_rejected() {
        let engine = LocalEngine::new();
        let mut conn = engine.connect();

        assert!(matches!(
            conn.set_with_expiry("key1", b"v", u64::MAX),
            Err(EngineError::Transport(_))
        ));
        assert_eq!(conn.get("key1").unwrap(), None);

        conn.set("key2", b"v").unwrap();
        assert!(matches!(
            conn.expire("key2", u64::MAX),
            Err(EngineError::Transport(_))
        ));
        assert_eq!(conn.get("key2").unwrap(), Some(b"v".to_vec()));

        conn.watch("key2").unwrap();
        let outcome = conn.exec(&[
            Mutation::Delete { key: "key2".into() },
            Mutation::Set {
                key: "key3".into(),
                value: b"v".to_vec(),
                ttl: u64::MAX,
            },
        ]);
        assert!(matches!(outcome, Err(EngineError::Transport(_))));
        assert_eq!(conn.get("key2").unwrap(), Some(b"v".to_vec()));
        assert_eq!(conn.get("key3").unwrap(), None);
        assert_eq!(conn.watched_len(), 0);
    }

    #[test]
    fn test_list_values_are_wrong_type() {
        let engine = LocalEngine::new();
        let mut conn = engine.connect();

        conn.push_list("list", vec![b"a".to_vec()]);

        assert_eq!(conn.get("list"), Err(EngineError::WrongType));
        assert_eq!(conn.get_many(&["list".to_string()]).unwrap(), vec![None]);
        assert!(conn.exists("list").unwrap());
    }
}
