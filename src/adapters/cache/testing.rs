//! Test doubles for the cache tier and the identity store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::MemoryCacheClient;
use crate::domain::errors::DomainResult;
use crate::domain::models::{Page, User, UserChanges, UserUpdate};
use crate::domain::ports::{CacheClient, CacheError, CacheResult, UserStore};

/// How a [`FaultyCache`] misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultMode {
    /// Every call returns a connection error.
    Fail,
    /// Every call never completes.
    Hang,
}

/// A cache whose every call fails.
#[derive(Debug, Clone)]
pub struct FaultyCache {
    mode: FaultMode,
}

impl FaultyCache {
    pub const fn new(mode: FaultMode) -> Self {
        Self { mode }
    }

    async fn fault<T>(&self) -> CacheResult<T> {
        match self.mode {
            FaultMode::Fail => Err(CacheError::Connection("injected fault".to_string())),
            FaultMode::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl CacheClient for FaultyCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.fault().await
    }

    async fn get_many(&self, _keys: &[String]) -> CacheResult<Vec<Option<Vec<u8>>>> {
        self.fault().await
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Option<Duration>) -> CacheResult<()> {
        self.fault().await
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        self.fault().await
    }

    fn backend(&self) -> &'static str {
        "faulty"
    }
}

/// A working in-memory cache that remembers every write it saw.
#[derive(Clone)]
pub struct RecordingCache {
    inner: MemoryCacheClient,
    sets: Arc<Mutex<Vec<(String, Option<Duration>)>>>,
    deletes: Arc<Mutex<Vec<String>>>,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self {
            inner: MemoryCacheClient::new(10_000),
            sets: Arc::new(Mutex::new(Vec::new())),
            deletes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// `(key, ttl)` of every successful set, in call order.
    pub fn sets(&self) -> Vec<(String, Option<Duration>)> {
        self.sets.lock().map(|sets| sets.clone()).unwrap_or_default()
    }

    /// TTLs of every set whose key starts with `prefix`.
    pub fn ttls_for(&self, prefix: &str) -> Vec<Option<Duration>> {
        self.sets()
            .into_iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(_, ttl)| ttl)
            .collect()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().map(|deletes| deletes.clone()).unwrap_or_default()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.inner.contains(key).await
    }

    /// Write straight into the cache without recording it.
    pub async fn plant(&self, key: &str, value: &[u8]) {
        let _ = self.inner.set(key, value, None).await;
    }
}

impl Default for RecordingCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheClient for RecordingCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> CacheResult<()> {
        self.inner.set(key, value, ttl).await?;
        if let Ok(mut sets) = self.sets.lock() {
            sets.push((key.to_string(), ttl));
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.inner.delete(key).await?;
        if let Ok(mut deletes) = self.deletes.lock() {
            deletes.push(key.to_string());
        }
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "recording"
    }
}

/// Store wrapper that can serve an outdated snapshot, standing in for a
/// slow reader that loaded a record just before a concurrent write.
///
/// Also counts reads by identifier so tests can tell cache hits from
/// store hits.
pub struct StaleReadStore<S: UserStore> {
    inner: Arc<S>,
    pinned: Mutex<HashMap<String, User>>,
    reads: Mutex<HashMap<String, usize>>,
}

impl<S: UserStore> StaleReadStore<S> {
    pub fn new(inner: Arc<S>) -> Self {
        Self {
            inner,
            pinned: Mutex::new(HashMap::new()),
            reads: Mutex::new(HashMap::new()),
        }
    }

    /// Serve `user` on the next lookup of its identifier.
    pub fn pin_once(&self, user: User) {
        if let Ok(mut pinned) = self.pinned.lock() {
            pinned.insert(user.uuid.clone(), user);
        }
    }

    /// Number of `get_by_uuid` calls that reached this store for `uuid`.
    pub fn reads_of(&self, uuid: &str) -> usize {
        self.reads
            .lock()
            .map(|reads| reads.get(uuid).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

#[async_trait]
impl<S: UserStore + 'static> UserStore for StaleReadStore<S> {
    async fn create(&self, user: &User) -> DomainResult<User> {
        self.inner.create(user).await
    }

    async fn get_by_uuid(&self, uuid: &str) -> DomainResult<User> {
        if let Ok(mut reads) = self.reads.lock() {
            *reads.entry(uuid.to_string()).or_default() += 1;
        }
        let stale = self.pinned.lock().ok().and_then(|mut pinned| pinned.remove(uuid));
        match stale {
            Some(user) => Ok(user),
            None => self.inner.get_by_uuid(uuid).await,
        }
    }

    async fn get_by_phone(&self, telephone: &str) -> DomainResult<User> {
        self.inner.get_by_phone(telephone).await
    }

    async fn get_many(&self, uuids: &[String]) -> DomainResult<Vec<User>> {
        self.inner.get_many(uuids).await
    }

    async fn update(&self, uuid: &str, changes: &UserChanges) -> DomainResult<UserUpdate> {
        self.inner.update(uuid, changes).await
    }

    async fn exists_by_phone(&self, telephone: &str) -> DomainResult<bool> {
        self.inner.exists_by_phone(telephone).await
    }

    async fn exists_by_email(&self, email: &str) -> DomainResult<bool> {
        self.inner.exists_by_email(email).await
    }

    async fn search(&self, keyword: &str, page: Page) -> DomainResult<(Vec<User>, u64)> {
        self.inner.search(keyword, page).await
    }
}
