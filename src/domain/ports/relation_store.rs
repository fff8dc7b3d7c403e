//! Relationship store port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ChangeSlice, Page, Relation, RelationStatus, SyncCursor};

/// Persistence interface for directional relationship rows.
#[async_trait]
pub trait RelationStore: Send + Sync {
    /// Get the `owner -> peer` row in any status.
    async fn get(&self, owner: &str, peer: &str) -> DomainResult<Option<Relation>>;

    /// Make `owner` and `peer` friends in both directions atomically.
    ///
    /// Missing rows are inserted and removed rows reactivated. A direction
    /// that is already active is left untouched. Returns the
    /// `(owner -> peer, peer -> owner)` rows as stored.
    async fn create_pair(&self, owner: &str, peer: &str, source: &str) -> DomainResult<(Relation, Relation)>;

    /// Flip the `owner -> peer` row to removed. Only the owner's direction
    /// changes.
    ///
    /// Returns `false` without touching the row when it is not active.
    /// `NotFound` when no row exists.
    async fn remove(&self, owner: &str, peer: &str) -> DomainResult<bool>;

    async fn set_remark(&self, owner: &str, peer: &str, remark: &str) -> DomainResult<Relation>;

    async fn set_group_tag(&self, owner: &str, peer: &str, group_tag: &str) -> DomainResult<Relation>;

    /// Mark `target` as blocked by `owner`, creating the row if needed.
    async fn block(&self, owner: &str, target: &str) -> DomainResult<Relation>;

    /// Lift a block. Returns `false` when `target` was not blocked.
    async fn unblock(&self, owner: &str, target: &str) -> DomainResult<bool>;

    /// Rows of `owner` in `status`, with the total count.
    async fn list(
        &self,
        owner: &str,
        status: RelationStatus,
        group_tag: Option<&str>,
        page: Page,
    ) -> DomainResult<(Vec<Relation>, u64)>;

    /// Distinct non-empty group tags across the owner's active friends.
    async fn list_tags(&self, owner: &str) -> DomainResult<Vec<String>>;

    /// Rows strictly after `cursor` in `(updated_at, id)` order, at most
    /// `limit`, plus the owner's overall high-water mark, read from a
    /// single snapshot.
    async fn changes_since(&self, owner: &str, cursor: &SyncCursor, limit: u32) -> DomainResult<ChangeSlice>;
}
