//! Conversation lifecycle
//!
//! - Session cache: live conversations per (member, product), TTL-bound
//! - Session stores: Redis or in-process (DashMap)
//! - Manager: question/answer exchange, archival, session clearing

mod cache;
pub mod manager;
mod memory_store;
mod redis_store;
mod store;

pub use cache::SessionCache;
pub use manager::{ConversationManager, InferenceProvider};
pub use memory_store::InMemorySessionStore;
pub use redis_store::RedisSessionStore;
pub use store::{CacheError, SessionStore};
