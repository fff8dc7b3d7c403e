//! Roster setup and wiring
//!
//! - Default config file creation
//! - Database creation and migrations
//! - Cache backend selection
//! - Service construction

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::adapters::cache::{CachedUserRepository, MemoryCacheClient, RedisCacheClient, SoftCache, UserCachePolicy};
use crate::adapters::sqlite::{initialize_database, SqliteRelationStore, SqliteUserStore};
use crate::domain::models::{CacheBackend, CacheConfig, Config};
use crate::domain::ports::{CacheClient, NullCacheClient};
use crate::services::{FriendService, UserService};

/// Default configuration template content
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Roster Configuration
# Override settings by editing this file, adding roster.local.yaml, or
# setting environment variables with the ROSTER_ prefix
#
# Example environment variables:
#   export ROSTER_DATABASE__PATH=/var/lib/roster/roster.db
#   export ROSTER_CACHE__BACKEND=redis
#   export ROSTER_LOGGING__LEVEL=debug

database:
  # Path to SQLite database file
  path: ".roster/roster.db"
  # Maximum number of database connections in pool
  max_connections: 10
  # How long a query may wait for a connection before failing as unavailable
  acquire_timeout_ms: 3000

cache:
  # redis, memory, or none
  backend: "memory"
  redis_url: "redis://127.0.0.1:6379"
  # Upper bound on a single cache call; slower calls count as misses
  op_timeout_ms: 200
  # Snapshot TTL is user_ttl_secs plus a random 0..user_ttl_jitter_secs
  user_ttl_secs: 14400
  user_ttl_jitter_secs: 1800
  memory_max_capacity: 100000

sync:
  # Page size when the client asks for 0
  default_limit: 100
  max_limit: 500

logging:
  # Log level: trace, debug, info, warn, error
  level: "info"
  # Log format: json, pretty
  format: "pretty"
  # Rotation for files under log_dir: daily, hourly, never
  rotation: "daily"
"#;

/// Identity repository as wired for the application.
pub type AppUserRepository = CachedUserRepository<SqliteUserStore>;

/// Fully wired services.
pub struct AppContext {
    pub users: UserService<AppUserRepository>,
    pub friends: FriendService<AppUserRepository, SqliteRelationStore>,
    pub pool: SqlitePool,
    pub cache_backend: &'static str,
}

/// Write the default config file. Returns `false` when it already exists
/// and `force` is not set.
pub fn create_config_file(path: &Path, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    fs::write(path, DEFAULT_CONFIG_TEMPLATE).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

/// Connect the configured cache backend.
///
/// An unreachable Redis at startup degrades to the null cache; the
/// service keeps working against the store alone.
pub async fn build_cache(config: &CacheConfig) -> Arc<dyn CacheClient> {
    match config.backend {
        CacheBackend::Redis => match RedisCacheClient::connect(&config.redis_url).await {
            Ok(client) => Arc::new(client),
            Err(e) => {
                warn!(error = %e, url = %config.redis_url, "Redis unavailable, running without cache");
                Arc::new(NullCacheClient::new())
            }
        },
        CacheBackend::Memory => Arc::new(MemoryCacheClient::new(config.memory_max_capacity)),
        CacheBackend::None => Arc::new(NullCacheClient::new()),
    }
}

/// Open the database, apply migrations, and wire the services.
pub async fn build_context(config: &Config) -> Result<AppContext> {
    let pool = initialize_database(&config.database)
        .await
        .with_context(|| format!("Failed to open database at {}", config.database.path))?;

    let cache = SoftCache::new(build_cache(&config.cache).await, config.cache.op_timeout());
    let cache_backend = cache.backend();

    let users = Arc::new(CachedUserRepository::new(
        Arc::new(SqliteUserStore::new(pool.clone())),
        cache,
        UserCachePolicy::from(&config.cache),
    ));
    let relations = Arc::new(SqliteRelationStore::new(pool.clone()));

    info!(database = %config.database.path, cache = cache_backend, "Roster initialized");

    Ok(AppContext {
        users: UserService::new(users.clone()),
        friends: FriendService::new(users, relations, config.sync),
        pool,
        cache_backend,
    })
}
