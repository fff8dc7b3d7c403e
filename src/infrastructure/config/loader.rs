use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::{CacheBackend, Config};

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Redis backend selected but redis_url is empty")]
    EmptyRedisUrl,

    #[error("Invalid user_ttl_secs: {0}. Must be at least 1")]
    InvalidUserTtl(u64),

    #[error("Invalid sync limits: default_limit ({0}) must be between 1 and max_limit ({1})")]
    InvalidSyncLimits(u32, u32),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Environment variable prefix; nested keys are separated by `__`,
    /// e.g. `ROSTER_CACHE__BACKEND=redis`.
    pub const ENV_PREFIX: &'static str = "ROSTER_";

    /// Load configuration from the working directory.
    ///
    /// Later layers win: built-in defaults, `roster.yaml`, the optional
    /// `roster.local.yaml`, then `ROSTER_*` environment variables.
    pub fn load() -> Result<Config> {
        let config: Config = Self::layered(&[Path::new("roster.yaml"), Path::new("roster.local.yaml")])
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from an explicit file. Environment variables
    /// still override it.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config: Config = Self::layered(&[path])
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn layered(files: &[&Path]) -> Figment {
        let figment = files
            .iter()
            .fold(Figment::from(Serialized::defaults(Config::default())), |figment, file| {
                figment.merge(Yaml::file(file))
            });
        figment.merge(Env::prefixed(Self::ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        if config.cache.backend == CacheBackend::Redis && config.cache.redis_url.trim().is_empty() {
            return Err(ConfigError::EmptyRedisUrl);
        }

        if config.cache.user_ttl_secs == 0 {
            return Err(ConfigError::InvalidUserTtl(config.cache.user_ttl_secs));
        }

        let sync = config.sync;
        if sync.default_limit == 0 || sync.max_limit == 0 || sync.default_limit > sync.max_limit {
            return Err(ConfigError::InvalidSyncLimits(sync.default_limit, sync.max_limit));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn yaml_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{contents}").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database.path, ".roster/roster.db");
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.cache.user_ttl_secs, 4 * 3600);
        assert_eq!(config.cache.user_ttl_jitter_secs, 30 * 60);
        assert_eq!(config.sync.default_limit, 100);
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
database:
  path: /custom/roster.db
  max_connections: 5
cache:
  backend: redis
  redis_url: redis://cache:6379/2
  op_timeout_ms: 50
sync:
  default_limit: 20
  max_limit: 40
logging:
  level: debug
  format: json
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.database.path, "/custom/roster.db");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.cache.backend, CacheBackend::Redis);
        assert_eq!(config.cache.redis_url, "redis://cache:6379/2");
        assert_eq!(config.cache.op_timeout_ms, 50);
        assert_eq!(config.sync.max_limit, 40);
        assert_eq!(config.logging.format, "json");
        // Unset fields keep their defaults
        assert_eq!(config.cache.user_ttl_secs, 4 * 3600);

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_empty_database_path() {
        let mut config = Config::default();
        config.database.path = String::new();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::EmptyDatabasePath)));
    }

    #[test]
    fn test_validate_zero_max_connections() {
        let mut config = Config::default();
        config.database.max_connections = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxConnections(0))
        ));
    }

    #[test]
    fn test_validate_redis_needs_url() {
        let mut config = Config::default();
        config.cache.backend = CacheBackend::Redis;
        config.cache.redis_url = "  ".to_string();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::EmptyRedisUrl)));

        // Other backends ignore the URL
        config.cache.backend = CacheBackend::None;
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_ttl() {
        let mut config = Config::default();
        config.cache.user_ttl_secs = 0;
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidUserTtl(0))));
    }

    #[test]
    fn test_validate_sync_limits() {
        let mut config = Config::default();
        config.sync.default_limit = 600;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidSyncLimits(600, 500))
        ));

        config.sync.default_limit = 0;
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_validate_invalid_log_settings() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "loud"),
            other => panic!("Expected InvalidLogLevel, got {other:?}"),
        }

        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidLogFormat(_))));

        let mut config = Config::default();
        config.logging.rotation = "weekly".to_string();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidRotation(_))));
    }

    #[test]
    fn test_load_from_file_with_env_override() {
        let file = yaml_file("cache:\n  backend: none\nsync:\n  max_limit: 300\nlogging:\n  level: warn\n");

        temp_env::with_vars(
            [
                ("ROSTER_CACHE__BACKEND", Some("redis")),
                ("ROSTER_LOGGING__LEVEL", Some("debug")),
            ],
            || {
                let config = ConfigLoader::load_from_file(file.path()).unwrap();
                assert_eq!(config.cache.backend, CacheBackend::Redis, "Env should win over file");
                assert_eq!(config.logging.level, "debug");
                assert_eq!(config.sync.max_limit, 300, "File value should persist");
                assert_eq!(config.sync.default_limit, 100, "Default should persist");
            },
        );
    }

    #[test]
    fn test_load_from_file_rejects_invalid() {
        let file = yaml_file("sync:\n  default_limit: 10\n  max_limit: 5\n");
        let err = ConfigLoader::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("sync limits"));
    }

    #[test]
    fn test_hierarchical_merging() {
        let base = yaml_file("cache:\n  op_timeout_ms: 100\nlogging:\n  level: info\n  format: json\n");
        let local = yaml_file("cache:\n  op_timeout_ms: 25\nlogging:\n  level: debug\n");

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base.path()))
            .merge(Yaml::file(local.path()))
            .extract()
            .unwrap();

        assert_eq!(config.cache.op_timeout_ms, 25, "Override should win");
        assert_eq!(config.logging.level, "debug", "Override should win for nested fields");
        assert_eq!(config.logging.format, "json", "Base value should persist when not overridden");
    }
}
