//! Embedded schema migrations.
//!
//! Applied versions are recorded in `schema_migrations`. Each migration
//! runs in its own transaction together with its bookkeeping row.

use sqlx::SqlitePool;
use thiserror::Error;

use super::now_millis;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Failed to read schema version: {0}")]
    Bookkeeping(#[source] sqlx::Error),
    #[error("Migration {version} ({name}) failed: {source}")]
    Apply {
        version: i64,
        name: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

/// A schema step compiled into the binary.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

/// Every migration, in version order.
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "users and relations",
    sql: include_str!("../../../migrations/001_initial_schema.sql"),
}];

pub struct Migrator {
    pool: SqlitePool,
}

impl Migrator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Bring the schema up to date. Returns how many migrations ran.
    pub async fn run(&self) -> Result<usize, MigrationError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version    INTEGER PRIMARY KEY,
                name       TEXT    NOT NULL,
                applied_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(MigrationError::Bookkeeping)?;

        let current = self.schema_version().await?;
        let mut applied = 0;
        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            self.apply(migration).await?;
            tracing::info!(version = migration.version, name = migration.name, "Applied migration");
            applied += 1;
        }
        Ok(applied)
    }

    /// Highest applied version, 0 on a fresh database.
    pub async fn schema_version(&self) -> Result<i64, MigrationError> {
        let (version,): (i64,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(MigrationError::Bookkeeping)?;
        Ok(version)
    }

    async fn apply(&self, migration: &Migration) -> Result<(), MigrationError> {
        let fail = |source| MigrationError::Apply {
            version: migration.version,
            name: migration.name,
            source,
        };

        let mut tx = self.pool.begin().await.map_err(fail)?;
        sqlx::raw_sql(migration.sql).execute(&mut *tx).await.map_err(fail)?;
        sqlx::query("INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)")
            .bind(migration.version)
            .bind(migration.name)
            .bind(now_millis())
            .execute(&mut *tx)
            .await
            .map_err(fail)?;
        tx.commit().await.map_err(fail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::open_memory_pool;

    #[test]
    fn test_versions_strictly_increase() {
        assert!(MIGRATIONS.windows(2).all(|w| w[0].version < w[1].version));
        assert_eq!(MIGRATIONS[0].version, 1);
    }

    #[tokio::test]
    async fn test_migrations_apply_once() {
        let pool = open_memory_pool().await.unwrap();
        let migrator = Migrator::new(pool.clone());

        assert_eq!(migrator.run().await.unwrap(), MIGRATIONS.len());
        assert_eq!(migrator.schema_version().await.unwrap(), 1);
        assert_eq!(migrator.run().await.unwrap(), 0);

        let (tables,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'user_relations')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(tables, 2);
    }
}
