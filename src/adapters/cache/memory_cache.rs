//! In-process cache backend built on moka.

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};

use crate::domain::ports::{CacheClient, CacheResult};

#[derive(Clone)]
struct Entry {
    value: Vec<u8>,
    ttl: Option<Duration>,
}

/// Each entry carries its own TTL; overwriting an entry restarts it.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _created_at: Instant) -> Option<Duration> {
        entry.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        entry.ttl
    }
}

/// Single-node cache for deployments without Redis, and for tests.
#[derive(Clone)]
pub struct MemoryCacheClient {
    entries: Cache<String, Entry>,
}

impl MemoryCacheClient {
    pub fn new(max_capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self { entries }
    }

    /// Whether `key` currently holds a live value.
    pub async fn contains(&self, key: &str) -> bool {
        self.entries.get(key).await.is_some()
    }
}

#[async_trait]
impl CacheClient for MemoryCacheClient {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        Ok(self.entries.get(key).await.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> CacheResult<()> {
        let entry = Entry {
            value: value.to_vec(),
            ttl,
        };
        self.entries.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.invalidate(key).await;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = MemoryCacheClient::new(10);
        assert_eq!(cache.get("a").await.unwrap(), None);

        cache.set("a", b"one", None).await.unwrap();
        assert_eq!(cache.get("a").await.unwrap(), Some(b"one".to_vec()));

        cache.set("a", b"two", Some(Duration::from_secs(60))).await.unwrap();
        assert_eq!(cache.get("a").await.unwrap(), Some(b"two".to_vec()));

        cache.delete("a").await.unwrap();
        cache.delete("a").await.unwrap();
        assert!(!cache.contains("a").await);
    }

    #[tokio::test]
    async fn test_entries_expire_individually() {
        let cache = MemoryCacheClient::new(10);
        cache.set("short", b"x", Some(Duration::from_millis(30))).await.unwrap();
        cache.set("forever", b"y", None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(cache.get("short").await.unwrap(), None);
        assert_eq!(cache.get("forever").await.unwrap(), Some(b"y".to_vec()));
    }

    #[tokio::test]
    async fn test_get_many_keeps_key_order() {
        let cache = MemoryCacheClient::new(10);
        cache.set("b", b"2", None).await.unwrap();

        let keys = vec!["a".to_string(), "b".to_string()];
        assert_eq!(cache.get_many(&keys).await.unwrap(), vec![None, Some(b"2".to_vec())]);
    }
}
