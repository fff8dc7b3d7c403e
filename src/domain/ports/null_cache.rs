//! Null cache client implementation.
//!
//! Used when no cache tier is configured, or when the configured one
//! cannot be reached at startup.

use async_trait::async_trait;
use std::time::Duration;

use super::cache::{CacheClient, CacheResult};

/// A cache that stores nothing and always misses.
#[derive(Debug, Clone, Default)]
pub struct NullCacheClient;

impl NullCacheClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheClient for NullCacheClient {
    async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn get_many(&self, keys: &[String]) -> CacheResult<Vec<Option<Vec<u8>>>> {
        Ok(vec![None; keys.len()])
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Option<Duration>) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "none"
    }
}
