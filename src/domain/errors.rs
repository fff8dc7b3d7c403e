//! Domain errors for the roster store.

use thiserror::Error;

/// Domain-level errors surfaced by repositories and services.
///
/// Cache-tier faults never appear here; they are absorbed at the
/// [`SoftCache`](crate::adapters::cache::SoftCache) seam.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Invalid sync cursor: {0}")]
    InvalidCursor(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Operation not permitted: {0}")]
    PolicyViolation(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn user_not_found(key: impl Into<String>) -> Self {
        Self::NotFound { entity: "User", key: key.into() }
    }

    pub fn relation_not_found(owner: &str, peer: &str) -> Self {
        Self::NotFound {
            entity: "Relation",
            key: format!("{owner} -> {peer}"),
        }
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the caller may retry the same operation unchanged.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::DeadlineExceeded)
    }
}

/// SQLITE_BUSY and SQLITE_LOCKED, including their extended codes: another
/// connection held the lock past the busy timeout.
fn is_lock_contention(db_err: &dyn sqlx::error::DatabaseError) -> bool {
    db_err
        .code()
        .and_then(|code| code.parse::<i64>().ok())
        .is_some_and(|code| matches!(code & 0xff, 5 | 6))
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound {
                entity: "Row",
                key: "query returned no rows".to_string(),
            },
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                Self::Conflict(db_err.message().to_string())
            }
            sqlx::Error::Database(ref db_err) if is_lock_contention(&**db_err) => {
                Self::Unavailable(db_err.message().to_string())
            }
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Protocol(_) => Self::Unavailable(err.to_string()),
            other => Self::DatabaseError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
