//! Caller deadlines.

use std::future::Future;
use tokio::time::Instant;

use super::errors::{DomainError, DomainResult};

/// Run `fut` until `deadline`, failing with `DeadlineExceeded` after it.
///
/// Dropping the inner future cancels any in-flight store or cache call.
/// Post-commit cache invalidation runs on its own task and still completes.
pub async fn within<T, F>(deadline: Instant, fut: F) -> DomainResult<T>
where
    F: Future<Output = DomainResult<T>>,
{
    tokio::time::timeout_at(deadline, fut)
        .await
        .map_err(|_| DomainError::DeadlineExceeded)?
}
