//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies. Values travel as
//! UTF-8 strings; TTLs follow the cache contract (0 = never, < 0 = delete).

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::CacheError;

/// Maximum accepted key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

fn check_key(key: &str) -> Result<(), CacheError> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

/// Request body for set, add and replace
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: String,
    /// TTL in seconds
    #[serde(default)]
    pub ttl: i64,
}

impl SetRequest {
    pub fn validate(&self) -> Result<(), CacheError> {
        check_key(&self.key)
    }
}

/// Request body for compare-and-replace (POST /cas)
#[derive(Debug, Clone, Deserialize)]
pub struct CasRequest {
    /// Token returned by a previous read
    pub token: String,
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub ttl: i64,
}

impl CasRequest {
    pub fn validate(&self) -> Result<(), CacheError> {
        check_key(&self.key)
    }
}

/// Request body for increment and decrement
#[derive(Debug, Clone, Deserialize)]
pub struct CounterRequest {
    pub key: String,
    /// Value stored when the key is absent
    #[serde(default)]
    pub initial: i64,
    /// Amount to add or subtract, defaults to 1
    #[serde(default = "default_offset")]
    pub offset: i64,
    #[serde(default)]
    pub ttl: i64,
}

fn default_offset() -> i64 {
    1
}

impl CounterRequest {
    pub fn validate(&self) -> Result<(), CacheError> {
        check_key(&self.key)
    }
}

/// Request body for POST /touch
#[derive(Debug, Clone, Deserialize)]
pub struct TouchRequest {
    pub key: String,
    pub ttl: i64,
}

impl TouchRequest {
    pub fn validate(&self) -> Result<(), CacheError> {
        check_key(&self.key)
    }
}

/// Request body for POST /set_multi
#[derive(Debug, Clone, Deserialize)]
pub struct SetMultiRequest {
    pub items: HashMap<String, String>,
    #[serde(default)]
    pub ttl: i64,
}

impl SetMultiRequest {
    pub fn validate(&self) -> Result<(), CacheError> {
        self.items.keys().try_for_each(|key| check_key(key))
    }
}

/// Request body for POST /get_multi and POST /del_multi
#[derive(Debug, Clone, Deserialize)]
pub struct KeysRequest {
    pub keys: Vec<String>,
}

impl KeysRequest {
    pub fn validate(&self) -> Result<(), CacheError> {
        self.keys.iter().try_for_each(|key| check_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_request_deserialize() {
        let json = r#"{"key": "test", "value": "hello"}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.key, "test");
        assert_eq!(req.value, "hello");
        assert_eq!(req.ttl, 0);
    }

    #[test]
    fn test_set_request_negative_ttl() {
        let json = r#"{"key": "test", "value": "hello", "ttl": -1}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ttl, -1);
    }

    #[test]
    fn test_counter_request_defaults() {
        let req: CounterRequest = serde_json::from_str(r#"{"key": "hits"}"#).unwrap();
        assert_eq!(req.initial, 0);
        assert_eq!(req.offset, 1);
        assert_eq!(req.ttl, 0);
    }

    #[test]
    fn test_validate_keys() {
        let req = SetRequest {
            key: "".to_string(),
            value: "test".to_string(),
            ttl: 0,
        };
        assert!(matches!(req.validate(), Err(CacheError::InvalidRequest(_))));

        let req = KeysRequest {
            keys: vec!["ok".to_string(), "x".repeat(MAX_KEY_LENGTH + 1)],
        };
        assert!(req.validate().is_err());

        let req = TouchRequest {
            key: "valid_key".to_string(),
            ttl: 60,
        };
        assert!(req.validate().is_ok());
    }
}
