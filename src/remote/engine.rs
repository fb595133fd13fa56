//! Remote Engine Module
//!
//! The primitive command set the remote adapter is built on.

use thiserror::Error;

use crate::error::CacheError;

// == Engine Error ==
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The key holds something other than a byte string
    #[error("wrong type stored at key")]
    WrongType,

    /// Connection or protocol failure
    #[error("{0}")]
    Transport(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

impl From<EngineError> for CacheError {
    fn from(err: EngineError) -> Self {
        CacheError::Engine(err.to_string())
    }
}

// == Mutation ==
/// A write queued inside a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Store `value`; `ttl` of 0 never expires
    Set { key: String, value: Vec<u8>, ttl: u64 },
    Delete { key: String },
}

// == Commit ==
/// Outcome of executing a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    Applied,
    /// A watched key changed after it was watched; nothing was applied
    Aborted,
}

// == Remote Engine Trait ==
/// Request/response primitives of a remote key-value engine with optimistic
/// locking.
///
/// Every call is one blocking round trip. Watches belong to the connection
/// and stay active until [`RemoteEngine::exec`] or [`RemoteEngine::unwatch`].
pub trait RemoteEngine {
    /// Unconditional set without expiry.
    fn set(&mut self, key: &str, value: &[u8]) -> EngineResult<()>;

    /// Unconditional set expiring after `ttl` seconds.
    fn set_with_expiry(&mut self, key: &str, value: &[u8], ttl: u64) -> EngineResult<()>;

    fn get(&mut self, key: &str) -> EngineResult<Option<Vec<u8>>>;

    /// Values in key order; absent or non-string keys yield `None`.
    fn get_many(&mut self, keys: &[String]) -> EngineResult<Vec<Option<Vec<u8>>>>;

    /// Returns whether the key existed.
    fn delete(&mut self, key: &str) -> EngineResult<bool>;

    fn exists(&mut self, key: &str) -> EngineResult<bool>;

    /// Sets the expiry of an existing key; `ttl` of 0 removes it.
    /// Returns whether the key existed.
    fn expire(&mut self, key: &str, ttl: u64) -> EngineResult<bool>;

    fn flush(&mut self) -> EngineResult<()>;

    /// Starts watching a key for modifications by any party.
    fn watch(&mut self, key: &str) -> EngineResult<()>;

    /// Drops every watch held by this connection.
    fn unwatch(&mut self) -> EngineResult<()>;

    /// Begins a transaction, queues `mutations` and commits it.
    ///
    /// When a watched key changed since it was watched, the transaction is
    /// discarded as a whole and [`Commit::Aborted`] is returned. Watches are
    /// released either way.
    fn exec(&mut self, mutations: &[Mutation]) -> EngineResult<Commit>;
}
