pub mod models;
pub mod pool;
pub mod repository;

pub use models::*;
pub use pool::{DbPool, HealthCheck};
pub use repository::{HistoryStore, MemberDirectory, Repository};
