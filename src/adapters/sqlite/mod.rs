//! SQLite database adapters for the roster store.

pub mod connection;
pub mod migrations;
pub mod relation_store;
pub mod user_store;

pub use connection::{open_memory_pool, open_pool, ConnectionError};
pub use migrations::{Migration, MigrationError, Migrator, MIGRATIONS};
pub use relation_store::SqliteRelationStore;
pub use user_store::SqliteUserStore;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::DatabaseConfig;

/// Convert an epoch-millisecond column into a UTC timestamp.
pub fn parse_millis(ms: i64) -> DomainResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| DomainError::SerializationError(format!("Timestamp out of range: {ms}")))
}

/// Current time in epoch milliseconds, the resolution stored in every
/// `created_at` / `updated_at` column.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),
}

/// Open the configured database and bring its schema up to date.
pub async fn initialize_database(config: &DatabaseConfig) -> Result<SqlitePool, DatabaseError> {
    let pool = open_pool(config).await?;
    Migrator::new(pool.clone()).run().await?;
    Ok(pool)
}

/// Fresh in-memory database with the schema applied.
pub async fn create_migrated_test_pool() -> Result<SqlitePool, DatabaseError> {
    let pool = open_memory_pool().await?;
    Migrator::new(pool.clone()).run().await?;
    Ok(pool)
}
