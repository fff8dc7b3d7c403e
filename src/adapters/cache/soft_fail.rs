//! Soft-fail wrapper around a [`CacheClient`].
//!
//! The only place cache-tier errors are handled. Every call is bounded by
//! the configured operation timeout; failures and timeouts are logged and
//! turned into "no value" or "did not happen".

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::domain::ports::{CacheClient, CacheError, CacheResult};

#[derive(Clone)]
pub struct SoftCache {
    client: Arc<dyn CacheClient>,
    op_timeout: Duration,
}

impl SoftCache {
    pub fn new(client: Arc<dyn CacheClient>, op_timeout: Duration) -> Self {
        Self { client, op_timeout }
    }

    pub fn backend(&self) -> &'static str {
        self.client.backend()
    }

    async fn bounded<T>(&self, op: &'static str, key: &str, fut: impl Future<Output = CacheResult<T>>) -> Option<T> {
        let outcome = match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(self.op_timeout)),
        };

        match outcome {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(backend = self.client.backend(), op, key, error = %err, "Cache operation failed, continuing without cache");
                None
            }
        }
    }

    /// `None` on a miss or on any cache fault.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.bounded("get", key, self.client.get(key)).await.flatten()
    }

    /// One slot per key. A failed call yields all misses.
    pub async fn get_many(&self, keys: &[String]) -> Vec<Option<Vec<u8>>> {
        if keys.is_empty() {
            return Vec::new();
        }

        let label = keys.first().map_or("", String::as_str);
        match self.bounded("get_many", label, self.client.get_many(keys)).await {
            Some(values) if values.len() == keys.len() => values,
            Some(values) => {
                warn!(
                    backend = self.client.backend(),
                    expected = keys.len(),
                    received = values.len(),
                    "Cache returned a mismatched batch, treating as misses"
                );
                vec![None; keys.len()]
            }
            None => vec![None; keys.len()],
        }
    }

    /// Returns whether the write is known to have happened.
    pub async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> bool {
        self.bounded("set", key, self.client.set(key, value, ttl)).await.is_some()
    }

    /// Returns whether the delete is known to have happened.
    pub async fn delete(&self, key: &str) -> bool {
        self.bounded("delete", key, self.client.delete(key)).await.is_some()
    }
}
