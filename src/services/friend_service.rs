//! Friend service: relationship rules, blocking, and sync.
//!
//! Friendship is directional in storage. Adding a friend writes both
//! directions at once; removing one only drops the caller's direction and
//! leaves the peer's row for the peer to remove.

use std::sync::Arc;
use tracing::{info, instrument};

use super::clamp_page;
use super::relation_sync::RelationSyncRepository;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Page, Relation, RelationState, RelationStatus, SyncConfig, SyncPage, User};
use crate::domain::ports::{RelationStore, UserStore};

const MAX_REMARK_CHARS: usize = 64;
const MAX_TAG_CHARS: usize = 32;
const MAX_SOURCE_CHARS: usize = 32;

pub struct FriendService<U: UserStore, R: RelationStore> {
    users: Arc<U>,
    relations: Arc<R>,
    sync: RelationSyncRepository<R>,
}

impl<U: UserStore, R: RelationStore> FriendService<U, R> {
    pub fn new(users: Arc<U>, relations: Arc<R>, sync_limits: SyncConfig) -> Self {
        let sync = RelationSyncRepository::new(relations.clone(), sync_limits);
        Self { users, relations, sync }
    }

    fn reject_self(owner: &str, peer: &str, action: &str) -> DomainResult<()> {
        if owner == peer {
            return Err(DomainError::PolicyViolation(format!("cannot {action} yourself")));
        }
        Ok(())
    }

    async fn active_user(&self, uuid: &str) -> DomainResult<User> {
        let user = self.users.get_by_uuid(uuid).await?;
        if !user.is_active() {
            return Err(DomainError::PolicyViolation(format!("user {uuid} is disabled")));
        }
        Ok(user)
    }

    async fn ensure_not_blocked(&self, owner: &str, peer: &str) -> DomainResult<()> {
        if self.state(owner, peer).await? == RelationState::Blocked {
            return Err(DomainError::PolicyViolation("you have blocked this user".to_string()));
        }
        if self.state(peer, owner).await? == RelationState::Blocked {
            return Err(DomainError::PolicyViolation("this user has blocked you".to_string()));
        }
        Ok(())
    }

    async fn state(&self, owner: &str, peer: &str) -> DomainResult<RelationState> {
        let relation = self.relations.get(owner, peer).await?;
        Ok(RelationState::from(relation.as_ref()))
    }

    /// The `owner -> peer` row, which must be an active friendship.
    async fn friendship(&self, owner: &str, peer: &str) -> DomainResult<Relation> {
        match self.relations.get(owner, peer).await? {
            Some(relation) if relation.status.is_friend() => Ok(relation),
            _ => Err(DomainError::relation_not_found(owner, peer)),
        }
    }

    /// Make `owner` and `peer` friends in both directions.
    #[instrument(skip(self))]
    pub async fn add_friend(&self, owner: &str, peer: &str, source: &str) -> DomainResult<(Relation, Relation)> {
        Self::reject_self(owner, peer, "befriend")?;
        if source.chars().count() > MAX_SOURCE_CHARS {
            return Err(DomainError::ValidationFailed(format!(
                "source exceeds {MAX_SOURCE_CHARS} characters"
            )));
        }

        self.active_user(owner).await?;
        self.active_user(peer).await?;
        self.ensure_not_blocked(owner, peer).await?;

        if self.state(owner, peer).await? == RelationState::Friend
            && self.state(peer, owner).await? == RelationState::Friend
        {
            return Err(DomainError::Conflict(format!("{owner} and {peer} are already friends")));
        }

        let pair = self.relations.create_pair(owner, peer, source).await?;
        info!(owner, peer, "Friendship established");
        Ok(pair)
    }

    /// Drop `peer` from `owner`'s friend list. Returns `false` when it was
    /// already removed.
    #[instrument(skip(self))]
    pub async fn remove_friend(&self, owner: &str, peer: &str) -> DomainResult<bool> {
        Self::reject_self(owner, peer, "unfriend")?;
        let removed = self.relations.remove(owner, peer).await?;
        if removed {
            info!(owner, peer, "Friend removed");
        }
        Ok(removed)
    }

    #[instrument(skip(self))]
    pub async fn set_remark(&self, owner: &str, peer: &str, remark: &str) -> DomainResult<Relation> {
        if remark.chars().count() > MAX_REMARK_CHARS {
            return Err(DomainError::ValidationFailed(format!(
                "remark exceeds {MAX_REMARK_CHARS} characters"
            )));
        }
        self.friendship(owner, peer).await?;
        self.relations.set_remark(owner, peer, remark).await
    }

    #[instrument(skip(self))]
    pub async fn set_group_tag(&self, owner: &str, peer: &str, group_tag: &str) -> DomainResult<Relation> {
        let group_tag = group_tag.trim();
        if group_tag.chars().count() > MAX_TAG_CHARS {
            return Err(DomainError::ValidationFailed(format!(
                "group tag exceeds {MAX_TAG_CHARS} characters"
            )));
        }
        self.friendship(owner, peer).await?;
        self.relations.set_group_tag(owner, peer, group_tag).await
    }

    pub async fn list_friends(&self, owner: &str, group_tag: Option<&str>, page: Page) -> DomainResult<(Vec<Relation>, u64)> {
        self.relations
            .list(owner, RelationStatus::Active, group_tag, clamp_page(page))
            .await
    }

    pub async fn list_tags(&self, owner: &str) -> DomainResult<Vec<String>> {
        self.relations.list_tags(owner).await
    }

    pub async fn is_friend(&self, owner: &str, peer: &str) -> DomainResult<bool> {
        Ok(self.state(owner, peer).await? == RelationState::Friend)
    }

    /// How `owner` currently relates to `peer`, including "never related".
    pub async fn relation_status(&self, owner: &str, peer: &str) -> DomainResult<RelationState> {
        self.state(owner, peer).await
    }

    #[instrument(skip(self))]
    pub async fn block(&self, owner: &str, target: &str) -> DomainResult<Relation> {
        Self::reject_self(owner, target, "block")?;
        self.users.get_by_uuid(target).await?;

        let relation = self.relations.block(owner, target).await?;
        info!(owner, target, "User blocked");
        Ok(relation)
    }

    /// Lift a block. Returns `false` when `target` was not blocked.
    #[instrument(skip(self))]
    pub async fn unblock(&self, owner: &str, target: &str) -> DomainResult<bool> {
        let lifted = self.relations.unblock(owner, target).await?;
        if lifted {
            info!(owner, target, "User unblocked");
        }
        Ok(lifted)
    }

    pub async fn list_blocked(&self, owner: &str, page: Page) -> DomainResult<(Vec<Relation>, u64)> {
        self.relations
            .list(owner, RelationStatus::Blocked, None, clamp_page(page))
            .await
    }

    /// Whether `other` has blocked `owner`.
    pub async fn is_blocked_by(&self, owner: &str, other: &str) -> DomainResult<bool> {
        Ok(self.state(other, owner).await? == RelationState::Blocked)
    }

    /// Next page of `owner`'s relationship changes after `cursor`.
    pub async fn sync(&self, owner: &str, cursor: &str, limit: u32) -> DomainResult<SyncPage> {
        self.sync.sync(owner, cursor, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteRelationStore, SqliteUserStore};
    use crate::domain::models::{UserChanges, UserStatus};

    struct Fixture {
        service: FriendService<SqliteUserStore, SqliteRelationStore>,
        users: Arc<SqliteUserStore>,
    }

    impl Fixture {
        async fn new() -> Self {
            let pool = create_migrated_test_pool().await.unwrap();
            let users = Arc::new(SqliteUserStore::new(pool.clone()));
            let relations = Arc::new(SqliteRelationStore::new(pool));
            let service = FriendService::new(users.clone(), relations, SyncConfig::default());
            Self { service, users }
        }

        async fn user(&self, telephone: &str) -> String {
            self.users.create(&User::new(telephone, telephone)).await.unwrap().uuid
        }
    }

    #[tokio::test]
    async fn test_add_friend_rules() {
        let f = Fixture::new().await;
        let a = f.user("1").await;
        let b = f.user("2").await;

        let err = f.service.add_friend(&a, &a, "").await.unwrap_err();
        assert!(matches!(err, DomainError::PolicyViolation(_)));

        let err = f.service.add_friend(&a, "ghost", "").await.unwrap_err();
        assert!(err.is_not_found());

        f.service.add_friend(&a, &b, "search").await.unwrap();
        assert!(f.service.is_friend(&a, &b).await.unwrap());
        assert!(f.service.is_friend(&b, &a).await.unwrap());

        let err = f.service.add_friend(&b, &a, "").await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_cannot_befriend_disabled_user() {
        let f = Fixture::new().await;
        let a = f.user("1").await;
        let b = f.user("2").await;
        f.users.update(&b, &UserChanges::status(UserStatus::Disabled)).await.unwrap();

        let err = f.service.add_friend(&a, &b, "").await.unwrap_err();
        assert!(matches!(err, DomainError::PolicyViolation(_)));
    }

    #[tokio::test]
    async fn test_unfriend_is_asymmetric() {
        let f = Fixture::new().await;
        let a = f.user("1").await;
        let b = f.user("2").await;
        f.service.add_friend(&a, &b, "").await.unwrap();

        assert!(f.service.remove_friend(&a, &b).await.unwrap());
        assert!(!f.service.remove_friend(&a, &b).await.unwrap());

        assert_eq!(f.service.relation_status(&a, &b).await.unwrap(), RelationState::Removed);
        assert_eq!(f.service.relation_status(&b, &a).await.unwrap(), RelationState::Friend);

        // Re-adding restores the removed direction
        f.service.add_friend(&a, &b, "").await.unwrap();
        assert!(f.service.is_friend(&a, &b).await.unwrap());
    }

    #[tokio::test]
    async fn test_blocking_prevents_friendship_both_ways() {
        let f = Fixture::new().await;
        let a = f.user("1").await;
        let b = f.user("2").await;

        f.service.block(&a, &b).await.unwrap();
        assert!(f.service.is_blocked_by(&b, &a).await.unwrap());

        assert!(matches!(f.service.add_friend(&a, &b, "").await, Err(DomainError::PolicyViolation(_))));
        assert!(matches!(f.service.add_friend(&b, &a, "").await, Err(DomainError::PolicyViolation(_))));

        let (blocked, total) = f.service.list_blocked(&a, Page::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(blocked[0].peer_uuid, b);

        assert!(f.service.unblock(&a, &b).await.unwrap());
        f.service.add_friend(&a, &b, "").await.unwrap();
    }

    #[tokio::test]
    async fn test_remark_and_tag_require_friendship() {
        let f = Fixture::new().await;
        let a = f.user("1").await;
        let b = f.user("2").await;

        assert!(f.service.set_remark(&a, &b, "bee").await.unwrap_err().is_not_found());

        f.service.add_friend(&a, &b, "").await.unwrap();
        assert_eq!(f.service.set_remark(&a, &b, "bee").await.unwrap().remark, "bee");
        assert_eq!(f.service.set_group_tag(&a, &b, " work ").await.unwrap().group_tag, "work");
        assert_eq!(f.service.list_tags(&a).await.unwrap(), vec!["work"]);

        let (friends, _) = f.service.list_friends(&a, Some("work"), Page::default()).await.unwrap();
        assert_eq!(friends.len(), 1);

        let long = "x".repeat(MAX_REMARK_CHARS + 1);
        assert!(matches!(f.service.set_remark(&a, &b, &long).await, Err(DomainError::ValidationFailed(_))));
    }

    #[tokio::test]
    async fn test_relation_status_for_strangers() {
        let f = Fixture::new().await;
        let a = f.user("1").await;
        let b = f.user("2").await;
        assert_eq!(f.service.relation_status(&a, &b).await.unwrap(), RelationState::None);
    }
}
