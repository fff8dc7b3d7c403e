//! Incremental relationship sync.
//!
//! Clients hold a cursor into the owner's change feed and pull pages of
//! changed rows until `has_more` is false. Rows are ordered by
//! `(updated_at, id)`; the cursor names the last row delivered, so rows
//! that share a timestamp across a page boundary are neither skipped nor
//! repeated.

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::domain::errors::DomainResult;
use crate::domain::models::{ChangeType, RelationChange, SyncConfig, SyncCursor, SyncPage};
use crate::domain::ports::RelationStore;

pub struct RelationSyncRepository<R: RelationStore> {
    store: Arc<R>,
    limits: SyncConfig,
}

impl<R: RelationStore> RelationSyncRepository<R> {
    pub fn new(store: Arc<R>, limits: SyncConfig) -> Self {
        Self { store, limits }
    }

    /// Page size actually used for a requested `limit`.
    pub fn effective_limit(&self, limit: u32) -> u32 {
        let limit = if limit == 0 { self.limits.default_limit } else { limit };
        limit.clamp(1, self.limits.max_limit.max(1))
    }

    /// Parse the client's cursor text and return the next page.
    ///
    /// An empty cursor or `"0"` starts a full sync.
    pub async fn sync(&self, owner: &str, cursor: &str, limit: u32) -> DomainResult<SyncPage> {
        let cursor: SyncCursor = cursor.parse()?;
        self.sync_from(owner, cursor, limit).await
    }

    #[instrument(skip(self, cursor), fields(cursor = %cursor))]
    pub async fn sync_from(&self, owner: &str, cursor: SyncCursor, limit: u32) -> DomainResult<SyncPage> {
        let limit = self.effective_limit(limit);
        let slice = self.store.changes_since(owner, &cursor, limit).await?;

        let has_more = slice.rows.len() == limit as usize;
        let latest_version = slice.max_version.unwrap_or(0).max(cursor.version);

        let next_cursor = match slice.rows.last() {
            Some(last) if has_more => cursor.next_after(last),
            _ => SyncCursor::after_version(latest_version),
        };

        let changes: Vec<RelationChange> = slice
            .rows
            .into_iter()
            .map(|relation| RelationChange {
                change_type: ChangeType::classify(&relation, &cursor),
                relation,
            })
            .collect();

        debug!(count = changes.len(), has_more, latest_version, next = %next_cursor, "Sync page built");

        Ok(SyncPage {
            changes,
            has_more,
            latest_version,
            next_cursor: next_cursor.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteRelationStore};
    use crate::domain::errors::DomainError;

    async fn setup(limits: SyncConfig) -> (Arc<SqliteRelationStore>, RelationSyncRepository<SqliteRelationStore>) {
        let pool = create_migrated_test_pool().await.unwrap();
        let store = Arc::new(SqliteRelationStore::new(pool));
        let sync = RelationSyncRepository::new(store.clone(), limits);
        (store, sync)
    }

    #[tokio::test]
    async fn test_limit_defaults_and_clamps() {
        let (_, sync) = setup(SyncConfig { default_limit: 50, max_limit: 200 }).await;
        assert_eq!(sync.effective_limit(0), 50);
        assert_eq!(sync.effective_limit(10), 10);
        assert_eq!(sync.effective_limit(10_000), 200);
    }

    #[tokio::test]
    async fn test_empty_feed_echoes_cursor() {
        let (_, sync) = setup(SyncConfig::default()).await;

        let page = sync.sync("u1", "0", 10).await.unwrap();
        assert!(page.changes.is_empty());
        assert!(!page.has_more);
        assert_eq!(page.latest_version, 0);
        assert_eq!(page.next_cursor, "0");

        let page = sync.sync("u1", "1700000000000", 10).await.unwrap();
        assert_eq!(page.latest_version, 1_700_000_000_000);
        assert_eq!(page.next_cursor, "1700000000000");
    }

    #[tokio::test]
    async fn test_malformed_cursor_is_rejected() {
        let (_, sync) = setup(SyncConfig::default()).await;
        for bad in ["abc", "-5", "1:x", "0:7"] {
            let err = sync.sync("u1", bad, 10).await.unwrap_err();
            assert!(matches!(err, DomainError::InvalidCursor(_)), "{bad}");
        }
    }

    #[tokio::test]
    async fn test_full_sync_pages_until_done() {
        let (store, sync) = setup(SyncConfig::default()).await;
        for peer in ["b", "c", "d"] {
            store.create_pair("a", peer, "").await.unwrap();
        }

        let first = sync.sync("a", "", 2).await.unwrap();
        assert_eq!(first.changes.len(), 2);
        assert!(first.has_more);
        assert!(first.changes.iter().all(|c| c.change_type == ChangeType::Added));

        let second = sync.sync("a", &first.next_cursor, 2).await.unwrap();
        assert_eq!(second.changes.len(), 1);
        assert!(!second.has_more);
        assert_eq!(second.latest_version, first.latest_version);
        assert_eq!(second.next_cursor, second.latest_version.to_string());

        let done = sync.sync("a", &second.next_cursor, 2).await.unwrap();
        assert!(done.changes.is_empty());
    }

    async fn tags_by_peer(sync: &RelationSyncRepository<SqliteRelationStore>, cursor: &str) -> (Vec<(String, ChangeType)>, String) {
        let mut seen = Vec::new();
        let mut cursor = cursor.to_string();
        loop {
            let page = sync.sync("a", &cursor, 1).await.unwrap();
            seen.extend(page.changes.iter().map(|c| (c.relation.peer_uuid.clone(), c.change_type)));
            cursor = page.next_cursor;
            if !page.has_more {
                return (seen, cursor);
            }
        }
    }

    #[tokio::test]
    async fn test_tags_stay_consistent_across_pages() {
        let (store, sync) = setup(SyncConfig::default()).await;
        for peer in ["b", "c", "d"] {
            store.create_pair("a", peer, "").await.unwrap();
        }
        // Edits move b and c behind d in feed order
        store.set_remark("a", "b", "bee").await.unwrap();
        store.set_remark("a", "c", "sea").await.unwrap();

        let (first_sync, done) = tags_by_peer(&sync, "0").await;
        let peers: Vec<&str> = first_sync.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(peers, vec!["d", "b", "c"]);
        assert!(first_sync.iter().all(|(_, tag)| *tag == ChangeType::Added), "{first_sync:?}");

        store.create_pair("a", "e", "").await.unwrap();
        store.create_pair("a", "f", "").await.unwrap();
        store.set_remark("a", "d", "dee").await.unwrap();
        store.set_group_tag("a", "e", "work").await.unwrap();

        let (round, _) = tags_by_peer(&sync, &done).await;
        assert_eq!(
            round,
            vec![
                ("f".to_string(), ChangeType::Added),
                ("d".to_string(), ChangeType::Updated),
                ("e".to_string(), ChangeType::Added),
            ]
        );
    }

    #[tokio::test]
    async fn test_blocked_rows_surface_as_deleted() {
        let (store, sync) = setup(SyncConfig::default()).await;
        store.create_pair("a", "b", "").await.unwrap();
        let start = sync.sync("a", "0", 10).await.unwrap();

        store.block("a", "b").await.unwrap();

        let page = sync.sync("a", &start.next_cursor, 10).await.unwrap();
        assert_eq!(page.changes.len(), 1);
        assert_eq!(page.changes[0].change_type, ChangeType::Deleted);
    }
}
