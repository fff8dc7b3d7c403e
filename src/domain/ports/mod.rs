//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces that infrastructure adapters implement:
//! - UserStore: identity record persistence
//! - RelationStore: directional relationship persistence and change feed
//! - CacheClient: key-value cache tier

pub mod cache;
pub mod null_cache;
pub mod relation_store;
pub mod user_store;

pub use cache::{CacheClient, CacheError, CacheResult};
pub use null_cache::NullCacheClient;
pub use relation_store::RelationStore;
pub use user_store::UserStore;
