use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Roster
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Cache tier configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Relationship sync limits
    #[serde(default)]
    pub sync: SyncConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a caller may wait for a pooled connection
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

fn default_database_path() -> String {
    ".roster/roster.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_acquire_timeout_ms() -> u64 {
    3_000
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
        }
    }
}

/// Which cache tier backs identity lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    /// Shared Redis instance
    Redis,
    /// In-process moka cache (single node)
    Memory,
    /// Always miss; every read goes to the store
    None,
}

/// Cache tier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    #[serde(default = "default_cache_backend")]
    pub backend: CacheBackend,

    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Upper bound on a single cache call
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,

    /// Base TTL of a user snapshot
    #[serde(default = "default_user_ttl_secs")]
    pub user_ttl_secs: u64,

    /// Maximum random extension added to each snapshot TTL
    #[serde(default = "default_user_ttl_jitter_secs")]
    pub user_ttl_jitter_secs: u64,

    /// Entry cap for the in-process backend
    #[serde(default = "default_memory_max_capacity")]
    pub memory_max_capacity: u64,
}

const fn default_cache_backend() -> CacheBackend {
    CacheBackend::Memory
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

const fn default_op_timeout_ms() -> u64 {
    200
}

const fn default_user_ttl_secs() -> u64 {
    4 * 60 * 60
}

const fn default_user_ttl_jitter_secs() -> u64 {
    30 * 60
}

const fn default_memory_max_capacity() -> u64 {
    100_000
}

impl CacheConfig {
    pub const fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }

    pub const fn user_ttl(&self) -> Duration {
        Duration::from_secs(self.user_ttl_secs)
    }

    pub const fn user_ttl_jitter(&self) -> Duration {
        Duration::from_secs(self.user_ttl_jitter_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            redis_url: default_redis_url(),
            op_timeout_ms: default_op_timeout_ms(),
            user_ttl_secs: default_user_ttl_secs(),
            user_ttl_jitter_secs: default_user_ttl_jitter_secs(),
            memory_max_capacity: default_memory_max_capacity(),
        }
    }
}

/// Relationship sync configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SyncConfig {
    /// Page size used when the client sends 0
    #[serde(default = "default_sync_limit")]
    pub default_limit: u32,

    /// Requested page sizes are clamped to this
    #[serde(default = "default_sync_max_limit")]
    pub max_limit: u32,
}

const fn default_sync_limit() -> u32 {
    100
}

const fn default_sync_max_limit() -> u32 {
    500
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_limit: default_sync_limit(),
            max_limit: default_sync_max_limit(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// File rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
