//! Connection pools for the roster database.
//!
//! File databases run in WAL mode so sync reads never queue behind
//! writers. SQLite's busy timeout shares the pool's acquire budget, so a
//! contended write gives up within the same bound as a starved caller.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::domain::models::DatabaseConfig;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Database path is empty")]
    EmptyPath,
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to open database: {0}")]
    Open(#[source] sqlx::Error),
}

/// Open the file database described by `config`, creating it and its
/// parent directory on first use.
pub async fn open_pool(config: &DatabaseConfig) -> Result<SqlitePool, ConnectionError> {
    if config.path.trim().is_empty() {
        return Err(ConnectionError::EmptyPath);
    }

    let path = Path::new(&config.path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ConnectionError::CreateDirectory {
            path: parent.display().to_string(),
            source,
        })?;
    }

    let wait = Duration::from_millis(config.acquire_timeout_ms);
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(wait);

    SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(wait)
        .connect_with(options)
        .await
        .map_err(ConnectionError::Open)
}

/// A private in-memory database behind exactly one connection.
///
/// The connection is never recycled, since closing it would drop the
/// database. Callers must not hold a transaction open while issuing other
/// queries on the same pool.
pub async fn open_memory_pool() -> Result<SqlitePool, ConnectionError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(ConnectionError::Open)?
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(ConnectionError::Open)
}
