//! Redis Engine Module
//!
//! Maps the engine primitives onto Redis commands over a blocking connection.

use redis::{Connection, RedisError, Value};
use tracing::debug;

use super::engine::{Commit, EngineError, EngineResult, Mutation, RemoteEngine};

impl From<RedisError> for EngineError {
    fn from(err: RedisError) -> Self {
        if err.code() == Some("WRONGTYPE") {
            EngineError::WrongType
        } else {
            EngineError::Transport(err.to_string())
        }
    }
}

// == Redis Engine ==
/// A single Redis connection. Watches are scoped to it.
pub struct RedisEngine {
    conn: Connection,
}

impl RedisEngine {
    /// Wraps an established connection.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Connects to the server at `url` (e.g. `redis://127.0.0.1:6379/0`).
    pub fn open(url: &str) -> EngineResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection()?;
        debug!("Connected to Redis at {}", url);
        Ok(Self::new(conn))
    }
}

impl RemoteEngine for RedisEngine {
    fn set(&mut self, key: &str, value: &[u8]) -> EngineResult<()> {
        redis::cmd("SET").arg(key).arg(value).query::<()>(&mut self.conn)?;
        Ok(())
    }

    fn set_with_expiry(&mut self, key: &str, value: &[u8], ttl: u64) -> EngineResult<()> {
        redis::cmd("SETEX")
            .arg(key)
            .arg(ttl)
            .arg(value)
            .query::<()>(&mut self.conn)?;
        Ok(())
    }

    fn get(&mut self, key: &str) -> EngineResult<Option<Vec<u8>>> {
        let value: Value = redis::cmd("GET").arg(key).query(&mut self.conn)?;
        match value {
            Value::Nil => Ok(None),
            Value::BulkString(bytes) => Ok(Some(bytes)),
            _ => Err(EngineError::WrongType),
        }
    }

    fn get_many(&mut self, keys: &[String]) -> EngineResult<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<Value> = redis::cmd("MGET").arg(keys).query(&mut self.conn)?;
        Ok(values
            .into_iter()
            .map(|value| match value {
                Value::BulkString(bytes) => Some(bytes),
                _ => None,
            })
            .collect())
    }

    fn delete(&mut self, key: &str) -> EngineResult<bool> {
        let removed: i64 = redis::cmd("DEL").arg(key).query(&mut self.conn)?;
        Ok(removed > 0)
    }

    fn exists(&mut self, key: &str) -> EngineResult<bool> {
        let count: i64 = redis::cmd("EXISTS").arg(key).query(&mut self.conn)?;
        Ok(count > 0)
    }

    fn expire(&mut self, key: &str, ttl: u64) -> EngineResult<bool> {
        if ttl > 0 {
            let updated: i64 = redis::cmd("EXPIRE")
                .arg(key)
                .arg(ttl)
                .query(&mut self.conn)?;
            return Ok(updated == 1);
        }

        // PERSIST answers 0 both for a missing key and for a key without expiry
        if !self.exists(key)? {
            return Ok(false);
        }
        redis::cmd("PERSIST").arg(key).query::<i64>(&mut self.conn)?;
        Ok(true)
    }

    fn flush(&mut self) -> EngineResult<()> {
        redis::cmd("FLUSHDB").query::<()>(&mut self.conn)?;
        Ok(())
    }

    fn watch(&mut self, key: &str) -> EngineResult<()> {
        redis::cmd("WATCH").arg(key).query::<()>(&mut self.conn)?;
        Ok(())
    }

    fn unwatch(&mut self) -> EngineResult<()> {
        redis::cmd("UNWATCH").query::<()>(&mut self.conn)?;
        Ok(())
    }

    fn exec(&mut self, mutations: &[Mutation]) -> EngineResult<Commit> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        for mutation in mutations {
            match mutation {
                Mutation::Set { key, value, ttl: 0 } => {
                    pipe.cmd("SET").arg(key).arg(value.as_slice()).ignore();
                }
                Mutation::Set { key, value, ttl } => {
                    pipe.cmd("SETEX")
                        .arg(key)
                        .arg(*ttl)
                        .arg(value.as_slice())
                        .ignore();
                }
                Mutation::Delete { key } => {
                    pipe.cmd("DEL").arg(key).ignore();
                }
            }
        }

        // EXEC replies nil when a watched key changed
        let reply: Option<()> = pipe.query(&mut self.conn)?;
        Ok(match reply {
            Some(()) => Commit::Applied,
            None => Commit::Aborted,
        })
    }
}
