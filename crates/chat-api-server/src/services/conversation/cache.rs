use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::store::{CacheError, SessionStore};
use crate::models::chat::{ChatTurn, Conversation, MemberId, ProductId};

/// Live conversations keyed by (member, product).
///
/// Every fault of the underlying store is absorbed here: reads fall back to
/// an empty conversation and writes are only logged, so a cache outage never
/// fails a question/answer exchange.
#[derive(Clone)]
pub struct SessionCache {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
    key_prefix: String,
}

impl SessionCache {
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            ttl,
            key_prefix: key_prefix.into(),
        }
    }

    /// `{prefix}:{member}:{product}`; both ids are integers so the
    /// separator keeps pairs apart.
    pub fn key(&self, member_id: MemberId, product_id: ProductId) -> String {
        format!("{}:{}:{}", self.key_prefix, member_id, product_id)
    }

    /// Cached conversation, empty when absent, expired or unreadable
    pub async fn load(&self, member_id: MemberId, product_id: ProductId) -> Conversation {
        match self.try_load(member_id, product_id).await {
            Ok(conversation) => conversation,
            Err(e) => {
                error!(member_id, product_id, "Session load failed: {}", e);
                Conversation::new()
            }
        }
    }

    async fn try_load(
        &self,
        member_id: MemberId,
        product_id: ProductId,
    ) -> Result<Conversation, CacheError> {
        let Some(raw) = self.store.get(&self.key(member_id, product_id)).await? else {
            return Ok(Conversation::new());
        };

        let conversation: Option<Conversation> =
            serde_json::from_str(&raw).map_err(CacheError::Decode)?;
        let conversation = conversation.unwrap_or_default();

        debug!(member_id, product_id, turns = conversation.len(), "Loaded session");
        Ok(conversation)
    }

    /// Overwrite the whole conversation and restart its idle timer
    pub async fn save(&self, member_id: MemberId, product_id: ProductId, conversation: &[ChatTurn]) {
        if let Err(e) = self.try_save(member_id, product_id, conversation).await {
            error!(member_id, product_id, "Session save failed: {}", e);
        }
    }

    async fn try_save(
        &self,
        member_id: MemberId,
        product_id: ProductId,
        conversation: &[ChatTurn],
    ) -> Result<(), CacheError> {
        let payload = serde_json::to_string(conversation).map_err(CacheError::Encode)?;
        self.store
            .set_with_ttl(&self.key(member_id, product_id), payload, self.ttl)
            .await?;

        debug!(member_id, product_id, turns = conversation.len(), "Saved session");
        Ok(())
    }

    /// load, push `turn`, save; returns the conversation including `turn`
    pub async fn append(
        &self,
        member_id: MemberId,
        product_id: ProductId,
        turn: ChatTurn,
    ) -> Conversation {
        let mut conversation = self.load(member_id, product_id).await;
        conversation.push(turn);
        self.save(member_id, product_id, &conversation).await;
        conversation
    }

    pub async fn delete(&self, member_id: MemberId, product_id: ProductId) {
        match self.store.delete(&self.key(member_id, product_id)).await {
            Ok(true) => info!(member_id, product_id, "Session deleted"),
            Ok(false) => warn!(member_id, product_id, "No session to delete"),
            Err(e) => error!(member_id, product_id, "Session delete failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::conversation::memory_store::InMemorySessionStore;
    use async_trait::async_trait;

    struct UnavailableStore;

    #[async_trait]
    impl SessionStore for UnavailableStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Backend("connection refused".into()))
        }

        async fn set_with_ttl(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".into()))
        }

        async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
            Err(CacheError::Backend("connection refused".into()))
        }
    }

    fn cache_with(store: Arc<dyn SessionStore>, ttl: Duration) -> SessionCache {
        SessionCache::new(store, ttl, "chat")
    }

    #[test]
    fn test_key_is_stable_and_distinct_per_pair() {
        let cache = cache_with(Arc::new(InMemorySessionStore::new()), Duration::from_secs(60));
        assert_eq!(cache.key(7, 42), "chat:7:42");
        assert_eq!(cache.key(7, 42), cache.key(7, 42));
        assert_ne!(cache.key(1, 23), cache.key(12, 3));
    }

    #[tokio::test]
    async fn test_save_then_load_keeps_order() {
        let cache = cache_with(Arc::new(InMemorySessionStore::new()), Duration::from_secs(60));
        let conversation = vec![
            ChatTurn::user("How do I reset this?"),
            ChatTurn::assistant("Hold the power button for ten seconds."),
            ChatTurn::user("And then?"),
        ];

        cache.save(7, 42, &conversation).await;

        assert_eq!(cache.load(7, 42).await, conversation);
        assert!(cache.load(7, 43).await.is_empty());
    }

    #[tokio::test]
    async fn test_append_returns_full_history() {
        let cache = cache_with(Arc::new(InMemorySessionStore::new()), Duration::from_secs(60));

        let first = cache.append(7, 42, ChatTurn::user("first")).await;
        assert_eq!(first, vec![ChatTurn::user("first")]);

        let second = cache.append(7, 42, ChatTurn::assistant("second")).await;
        assert_eq!(second.len(), 2);
        assert_eq!(cache.load(7, 42).await, second);
    }

    #[tokio::test]
    async fn test_expired_session_loads_empty() {
        let cache = cache_with(Arc::new(InMemorySessionStore::new()), Duration::from_millis(20));
        cache.save(7, 42, &[ChatTurn::user("hello")]).await;

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(cache.load(7, 42).await.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_payload_loads_empty() {
        let store = Arc::new(InMemorySessionStore::new());
        store
            .set_with_ttl("chat:7:42", "{not json".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        let cache = cache_with(store, Duration::from_secs(60));

        assert!(cache.load(7, 42).await.is_empty());
    }

    #[tokio::test]
    async fn test_null_payload_loads_empty() {
        let store = Arc::new(InMemorySessionStore::new());
        store
            .set_with_ttl("chat:7:42", "null".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        let cache = cache_with(store, Duration::from_secs(60));

        assert!(cache.load(7, 42).await.is_empty());
    }

    #[tokio::test]
    async fn test_legacy_payload_is_readable() {
        let store = Arc::new(InMemorySessionStore::new());
        store
            .set_with_ttl(
                "chat:7:42",
                r#"[{"role":"user","messages":"q"},{"role":"bot","messages":"a"}]"#.to_string(),
                Duration::from_secs(60),
            )
            .await
            .unwrap();
        let cache = cache_with(store, Duration::from_secs(60));

        assert_eq!(
            cache.load(7, 42).await,
            vec![ChatTurn::user("q"), ChatTurn::assistant("a")]
        );
    }

    #[tokio::test]
    async fn test_unavailable_backend_is_absorbed() {
        let cache = cache_with(Arc::new(UnavailableStore), Duration::from_secs(60));

        assert!(cache.load(7, 42).await.is_empty());
        cache.save(7, 42, &[ChatTurn::user("q")]).await;
        cache.delete(7, 42).await;

        let appended = cache.append(7, 42, ChatTurn::user("q")).await;
        assert_eq!(appended, vec![ChatTurn::user("q")]);
    }

    #[tokio::test]
    async fn test_delete_absent_session_is_not_an_error() {
        let store = Arc::new(InMemorySessionStore::new());
        let cache = cache_with(store.clone(), Duration::from_secs(60));

        cache.delete(7, 42).await;
        cache.save(7, 42, &[ChatTurn::user("q")]).await;
        cache.delete(7, 42).await;

        assert!(store.is_empty());
    }
}
