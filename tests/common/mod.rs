//! Common test utilities for integration tests
//!
//! Builds stores over a migrated in-memory database and wires them into
//! the cache-aside repository and the services.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use roster::adapters::cache::{CachedUserRepository, SoftCache, UserCachePolicy};
use roster::adapters::sqlite::{create_migrated_test_pool, SqliteRelationStore, SqliteUserStore};
use roster::domain::ports::CacheClient;
use roster::{FriendService, SyncConfig, User, UserService};
use sqlx::SqlitePool;

/// Per-operation cache timeout used by the fixtures.
pub const CACHE_OP_TIMEOUT: Duration = Duration::from_millis(200);

/// Setup test logging
///
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub async fn test_pool() -> SqlitePool {
    create_migrated_test_pool().await.expect("Failed to create test database")
}

/// A cache-aside repository over `store`, talking to `cache`.
pub fn cached_repo<S>(store: Arc<S>, cache: Arc<dyn CacheClient>, policy: UserCachePolicy) -> CachedUserRepository<S>
where
    S: roster::UserStore,
{
    CachedUserRepository::new(store, SoftCache::new(cache, CACHE_OP_TIMEOUT), policy)
}

/// Services wired the way the application wires them, over one database
/// and the given cache.
pub struct Harness {
    pub pool: SqlitePool,
    pub users: UserService<CachedUserRepository<SqliteUserStore>>,
    pub friends: FriendService<CachedUserRepository<SqliteUserStore>, SqliteRelationStore>,
    pub relations: Arc<SqliteRelationStore>,
}

impl Harness {
    pub async fn new(cache: Arc<dyn CacheClient>) -> Self {
        Self::with_sync_limits(cache, SyncConfig::default()).await
    }

    pub async fn with_sync_limits(cache: Arc<dyn CacheClient>, limits: SyncConfig) -> Self {
        let pool = test_pool().await;
        let repo = Arc::new(cached_repo(
            Arc::new(SqliteUserStore::new(pool.clone())),
            cache,
            UserCachePolicy::default(),
        ));
        let relations = Arc::new(SqliteRelationStore::new(pool.clone()));

        Self {
            users: UserService::new(repo.clone()),
            friends: FriendService::new(repo, relations.clone(), limits),
            relations,
            pool,
        }
    }

    /// Register `count` users with distinct phone numbers.
    pub async fn register_many(&self, count: usize) -> Vec<User> {
        let mut users = Vec::with_capacity(count);
        for i in 0..count {
            let user = self
                .users
                .register(&format!("1380000{i:04}"), &format!("user{i}"), None)
                .await
                .expect("Failed to register user");
            users.push(user);
        }
        users
    }

    /// Force every relationship row of `owner` to the same version.
    pub async fn flatten_versions(&self, owner: &str, version: i64) {
        sqlx::query("UPDATE user_relations SET updated_at = ? WHERE owner_uuid = ?")
            .bind(version)
            .bind(owner)
            .execute(&self.pool)
            .await
            .expect("Failed to rewrite versions");
    }

    /// Highest version across the owner's relationships, 0 when none.
    pub async fn newest_version(&self, owner: &str) -> i64 {
        let (version,): (Option<i64>,) = sqlx::query_as("SELECT MAX(updated_at) FROM user_relations WHERE owner_uuid = ?")
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to read versions");
        version.unwrap_or(0)
    }
}
