use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::store::{CacheError, SessionStore};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Thread-safe in-process session store.
/// Uses DashMap for lock-free concurrent access; expired entries are
/// dropped lazily on read or by `cleanup_expired`.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    storage: Arc<DashMap<String, Entry>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        info!("Initializing in-memory session store");
        Self::default()
    }

    /// Number of stored entries, expired ones included until swept
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Remove expired entries, returns how many were dropped
    pub fn cleanup_expired(&self) -> usize {
        let start_len = self.storage.len();
        self.storage.retain(|_, entry| !entry.is_expired());
        let count = start_len.saturating_sub(self.storage.len());

        if count > 0 {
            info!("Cleaned up {} expired sessions", count);
        }

        count
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let Some(entry) = self.storage.get(key) else {
            return Ok(None);
        };

        if !entry.is_expired() {
            return Ok(Some(entry.value.clone()));
        }
        drop(entry); // Release read lock

        // Re-checked under the write lock: a concurrent set may have refreshed the key
        if self.storage.remove_if(key, |_, entry| entry.is_expired()).is_some() {
            debug!("Session {} expired, removed from store", key);
        }
        Ok(None)
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.storage.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.storage.remove(key).is_some())
    }
}
