//! Cache-aside decorator for UserStore.
//!
//! Reads go to the cache first and fall back to the wrapped store,
//! repopulating on the way out. Writes hit the store first and then delete
//! the cached snapshot; they never overwrite it. A phone-number index
//! (`phone -> uuid`, no expiry) sits beside the snapshots.
//!
//! Cache faults are absorbed by [`SoftCache`]; only store errors reach
//! callers.

use async_trait::async_trait;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::SoftCache;
use crate::domain::errors::DomainResult;
use crate::domain::models::{CacheConfig, Page, User, UserChanges, UserUpdate};
use crate::domain::ports::UserStore;

const USER_INFO_PREFIX: &str = "user:info:uid:";
const PHONE_INDEX_PREFIX: &str = "user:idx:phone:";

/// Cache key of a user snapshot.
pub fn user_key(uuid: &str) -> String {
    format!("{USER_INFO_PREFIX}{uuid}")
}

/// Cache key of a phone index entry.
pub fn phone_key(telephone: &str) -> String {
    format!("{PHONE_INDEX_PREFIX}{telephone}")
}

/// Expiry of cached user snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserCachePolicy {
    pub base_ttl: Duration,
    pub jitter: Duration,
}

impl UserCachePolicy {
    pub const fn new(base_ttl: Duration, jitter: Duration) -> Self {
        Self { base_ttl, jitter }
    }

    /// A fresh TTL drawn uniformly from `[base_ttl, base_ttl + jitter]`.
    pub fn snapshot_ttl(&self) -> Duration {
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return self.base_ttl;
        }
        self.base_ttl + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }
}

impl Default for UserCachePolicy {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for UserCachePolicy {
    fn from(config: &CacheConfig) -> Self {
        Self::new(config.user_ttl(), config.user_ttl_jitter())
    }
}

async fn write_snapshot(cache: &SoftCache, policy: UserCachePolicy, user: &User) {
    match serde_json::to_vec(user) {
        Ok(bytes) => {
            cache.set(&user_key(&user.uuid), &bytes, Some(policy.snapshot_ttl())).await;
        }
        Err(e) => warn!(uuid = %user.uuid, error = %e, "Failed to encode user snapshot"),
    }
}

async fn write_phone_index(cache: &SoftCache, user: &User) {
    cache.set(&phone_key(&user.telephone), user.uuid.as_bytes(), None).await;
}

/// Decode a snapshot read from the cache. Undecodable entries are
/// deleted and read as a miss.
async fn decode_snapshot(cache: &SoftCache, key: &str, bytes: &[u8]) -> Option<User> {
    match serde_json::from_slice::<User>(bytes) {
        Ok(user) => Some(user),
        Err(e) => {
            warn!(key, error = %e, "Dropping undecodable user snapshot");
            cache.delete(key).await;
            None
        }
    }
}

/// Cache-aside user repository decorator.
pub struct CachedUserRepository<S: UserStore> {
    inner: Arc<S>,
    cache: SoftCache,
    policy: UserCachePolicy,
}

impl<S: UserStore> CachedUserRepository<S> {
    pub fn new(inner: Arc<S>, cache: SoftCache, policy: UserCachePolicy) -> Self {
        Self { inner, cache, policy }
    }

    async fn cached_snapshot(&self, uuid: &str) -> Option<User> {
        let key = user_key(uuid);
        let bytes = self.cache.get(&key).await?;
        decode_snapshot(&self.cache, &key, &bytes).await
    }

    async fn cached_uuid_for_phone(&self, telephone: &str) -> Option<String> {
        let key = phone_key(telephone);
        let bytes = self.cache.get(&key).await?;
        match String::from_utf8(bytes) {
            Ok(uuid) if !uuid.is_empty() => Some(uuid),
            _ => {
                warn!(key, "Dropping malformed phone index entry");
                self.cache.delete(&key).await;
                None
            }
        }
    }
}

#[async_trait]
impl<S: UserStore + 'static> UserStore for CachedUserRepository<S> {
    async fn create(&self, user: &User) -> DomainResult<User> {
        let created = self.inner.create(user).await?;

        // Freshly created, nothing can be racing to cache an older copy
        write_snapshot(&self.cache, self.policy, &created).await;
        write_phone_index(&self.cache, &created).await;

        Ok(created)
    }

    async fn get_by_uuid(&self, uuid: &str) -> DomainResult<User> {
        if let Some(user) = self.cached_snapshot(uuid).await {
            debug!(uuid, "User cache hit");
            return Ok(user);
        }

        debug!(uuid, "User cache miss");
        let user = self.inner.get_by_uuid(uuid).await?;
        write_snapshot(&self.cache, self.policy, &user).await;
        Ok(user)
    }

    async fn get_by_phone(&self, telephone: &str) -> DomainResult<User> {
        if let Some(uuid) = self.cached_uuid_for_phone(telephone).await {
            match self.get_by_uuid(&uuid).await {
                Ok(user) if user.telephone == telephone => {
                    debug!(telephone, "Phone index hit");
                    return Ok(user);
                }
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
            warn!(telephone, uuid = %uuid, "Phone index entry is stale, dropping it");
            self.cache.delete(&phone_key(telephone)).await;
        }

        debug!(telephone, "Phone index miss");
        let user = self.inner.get_by_phone(telephone).await?;
        write_phone_index(&self.cache, &user).await;
        write_snapshot(&self.cache, self.policy, &user).await;
        Ok(user)
    }

    async fn get_many(&self, uuids: &[String]) -> DomainResult<Vec<User>> {
        let mut seen = HashSet::new();
        let ids: Vec<String> = uuids.iter().filter(|id| seen.insert(id.as_str())).cloned().collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids.iter().map(|id| user_key(id)).collect();
        let cached = self.cache.get_many(&keys).await;

        let mut found: HashMap<String, User> = HashMap::with_capacity(ids.len());
        let mut misses = Vec::new();
        for ((id, key), slot) in ids.iter().zip(&keys).zip(cached) {
            let hit = match slot {
                Some(bytes) => decode_snapshot(&self.cache, key, &bytes).await,
                None => None,
            };
            match hit {
                Some(user) => {
                    found.insert(id.clone(), user);
                }
                None => misses.push(id.clone()),
            }
        }

        debug!(requested = ids.len(), hits = found.len(), misses = misses.len(), "Batch user lookup");

        if !misses.is_empty() {
            let fetched = self.inner.get_many(&misses).await?;

            // Population is advisory: the response below is built from the
            // rows just fetched, and the task outlives a cancelled caller.
            let cache = self.cache.clone();
            let policy = self.policy;
            let to_cache = fetched.clone();
            tokio::spawn(async move {
                for user in &to_cache {
                    write_snapshot(&cache, policy, user).await;
                }
            });

            for user in fetched {
                found.insert(user.uuid.clone(), user);
            }
        }

        Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
    }

    async fn update(&self, uuid: &str, changes: &UserChanges) -> DomainResult<UserUpdate> {
        let update = self.inner.update(uuid, changes).await?;

        // The store has committed. Invalidation runs on its own task so it
        // completes even if this future is dropped now.
        let cache = self.cache.clone();
        let uuid = update.user.uuid.clone();
        let phone_change = update
            .phone_changed()
            .then(|| (update.previous_telephone.clone(), update.user.clone()));

        let invalidation = tokio::spawn(async move {
            cache.delete(&user_key(&uuid)).await;
            if let Some((previous, user)) = phone_change {
                cache.delete(&phone_key(&previous)).await;
                write_phone_index(&cache, &user).await;
            }
        });

        if let Err(e) = invalidation.await {
            warn!(uuid = %update.user.uuid, error = %e, "Cache invalidation task failed");
        }

        Ok(update)
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
