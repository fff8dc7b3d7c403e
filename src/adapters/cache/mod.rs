//! Cache tier for identity lookups.
//!
//! Backends implement the `CacheClient` port (Redis, in-process moka, or
//! the null client). `SoftCache` bounds and absorbs their failures, and
//! `CachedUserRepository` layers cache-aside reads over a `UserStore`.

pub mod cached_user_repository;
pub mod memory_cache;
pub mod redis_cache;
pub mod soft_fail;
pub mod testing;

pub use cached_user_repository::{phone_key, user_key, CachedUserRepository, UserCachePolicy};
pub use memory_cache::MemoryCacheClient;
pub use redis_cache::RedisCacheClient;
pub use soft_fail::SoftCache;
