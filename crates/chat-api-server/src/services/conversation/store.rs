use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Faults of the session cache layer. These never leave `SessionCache`:
/// they are logged and the exchange carries on.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Failed to decode cached conversation: {0}")]
    Decode(serde_json::Error),

    #[error("Failed to encode conversation: {0}")]
    Encode(serde_json::Error),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

/// String key-value store with per-entry expiration
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Value stored under `key`, `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value`, replacing any previous one; it expires `ttl` from now
    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Returns whether an entry was removed
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;
}
