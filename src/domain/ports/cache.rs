//! Cache tier port.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failure of the cache tier itself. A miss is not an error.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    Connection(String),

    #[error("Cache operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cache command failed: {0}")]
    Command(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Key-value cache client.
///
/// Every call may fail; callers must go through
/// [`SoftCache`](crate::adapters::cache::SoftCache) so failures never
/// reach business logic.
#[async_trait]
pub trait CacheClient: Send + Sync {
    /// `Ok(None)` on a miss.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// One slot per key, in key order.
    async fn get_many(&self, keys: &[String]) -> CacheResult<Vec<Option<Vec<u8>>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get(key).await?);
        }
        Ok(values)
    }

    /// Store `value`; `ttl = None` means no expiry.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> CacheResult<()>;

    /// Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}
