//! User service: registration and profile rules over the identity store.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, instrument};

use super::clamp_page;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Page, ProfilePatch, User, UserChanges};
use crate::domain::ports::UserStore;

const MAX_NICKNAME_CHARS: usize = 32;
const MAX_SIGNATURE_CHARS: usize = 128;
const MAX_TELEPHONE_LEN: usize = 20;

/// Largest identifier set accepted by one batch lookup.
pub const MAX_BATCH_SIZE: usize = 100;

pub struct UserService<U: UserStore> {
    users: Arc<U>,
}

impl<U: UserStore> UserService<U> {
    pub fn new(users: Arc<U>) -> Self {
        Self { users }
    }

    /// Register a new user.
    #[instrument(skip(self, email))]
    pub async fn register(&self, telephone: &str, nickname: &str, email: Option<&str>) -> DomainResult<User> {
        validate_telephone(telephone)?;
        validate_nickname(nickname)?;

        let email = email.map(str::trim).filter(|e| !e.is_empty());
        if let Some(email) = email {
            validate_email(email)?;
        }

        if self.users.exists_by_phone(telephone).await? {
            return Err(DomainError::Conflict(format!("telephone {telephone} is already registered")));
        }
        if let Some(email) = email {
            if self.users.exists_by_email(email).await? {
                return Err(DomainError::Conflict(format!("email {email} is already registered")));
            }
        }

        let mut user = User::new(telephone, nickname.trim());
        if let Some(email) = email {
            user = user.with_email(email);
        }

        let user = self.users.create(&user).await?;
        info!(uuid = %user.uuid, "User registered");
        Ok(user)
    }

    pub async fn get_profile(&self, uuid: &str) -> DomainResult<User> {
        self.users.get_by_uuid(uuid).await
    }

    pub async fn get_by_phone(&self, telephone: &str) -> DomainResult<User> {
        validate_telephone(telephone)?;
        self.users.get_by_phone(telephone).await
    }

    /// Apply a partial profile edit. Only the fields set in `patch` are
    /// written; nothing is read back from the cache first.
    #[instrument(skip(self, patch))]
    pub async fn update_profile(&self, uuid: &str, patch: ProfilePatch) -> DomainResult<User> {
        if patch.is_empty() {
            return Err(DomainError::ValidationFailed("nothing to update".to_string()));
        }
        if let Some(nickname) = &patch.nickname {
            validate_nickname(nickname)?;
        }
        if let Some(signature) = &patch.signature {
            if signature.chars().count() > MAX_SIGNATURE_CHARS {
                return Err(DomainError::ValidationFailed(format!(
                    "signature exceeds {MAX_SIGNATURE_CHARS} characters"
                )));
            }
        }
        if let Some(birthday) = &patch.birthday {
            validate_birthday(birthday)?;
        }

        let update = self.users.update(uuid, &patch.into()).await?;
        info!(uuid, "Profile updated");
        Ok(update.user)
    }

    /// Move a user to a new phone number.
    ///
    /// Moving to the number the user already has rewrites it in place.
    #[instrument(skip(self))]
    pub async fn change_phone(&self, uuid: &str, telephone: &str) -> DomainResult<User> {
        validate_telephone(telephone)?;

        let update = self
            .users
            .update(uuid, &UserChanges::telephone(telephone))
            .await
            .map_err(|e| match e {
                DomainError::Conflict(_) => {
                    DomainError::Conflict(format!("telephone {telephone} is already registered"))
                }
                other => other,
            })?;

        if update.phone_changed() {
            info!(uuid, previous = %update.previous_telephone, "Telephone changed");
        }
        Ok(update.user)
    }

    /// Fetch the known users among `uuids`, in request order.
    pub async fn batch_get(&self, uuids: &[String]) -> DomainResult<Vec<User>> {
        if uuids.len() > MAX_BATCH_SIZE {
            return Err(DomainError::ValidationFailed(format!(
                "at most {MAX_BATCH_SIZE} users per batch, got {}",
                uuids.len()
            )));
        }
        self.users.get_many(uuids).await
    }

    pub async fn search(&self, keyword: &str, page: Page) -> DomainResult<(Vec<User>, u64)> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(DomainError::ValidationFailed("search keyword is empty".to_string()));
        }
        self.users.search(keyword, clamp_page(page)).await
    }
}

fn validate_telephone(telephone: &str) -> DomainResult<()> {
    let digits = telephone.strip_prefix('+').unwrap_or(telephone);
    if digits.is_empty() || telephone.len() > MAX_TELEPHONE_LEN || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(DomainError::ValidationFailed(format!("invalid telephone: {telephone:?}")));
    }
    Ok(())
}

fn validate_nickname(nickname: &str) -> DomainResult<()> {
    let len = nickname.trim().chars().count();
    if len == 0 || len > MAX_NICKNAME_CHARS {
        return Err(DomainError::ValidationFailed(format!(
            "nickname must be 1-{MAX_NICKNAME_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> DomainResult<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(DomainError::ValidationFailed(format!("invalid email: {email:?}"))),
    }
}

fn validate_birthday(birthday: &str) -> DomainResult<()> {
    if birthday.is_empty() || NaiveDate::parse_from_str(birthday, "%Y-%m-%d").is_ok() {
        Ok(())
    } else {
        Err(DomainError::ValidationFailed(format!("birthday must be YYYY-MM-DD, got {birthday:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::cache::testing::{RecordingCache, StaleReadStore};
    use crate::adapters::cache::{CachedUserRepository, SoftCache, UserCachePolicy};
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteUserStore};
    use crate::domain::models::Gender;
    use std::time::Duration;

    async fn setup() -> UserService<SqliteUserStore> {
        let pool = create_migrated_test_pool().await.unwrap();
        UserService::new(Arc::new(SqliteUserStore::new(pool)))
    }

    #[test]
    fn test_telephone_rules() {
        assert!(validate_telephone("13800000000").is_ok());
        assert!(validate_telephone("+8613800000000").is_ok());
        assert!(validate_telephone("").is_err());
        assert!(validate_telephone("+").is_err());
        assert!(validate_telephone("138-0000").is_err());
        assert!(validate_telephone("123456789012345678901").is_err());
    }

    #[test]
    fn test_birthday_rules() {
        assert!(validate_birthday("").is_ok());
        assert!(validate_birthday("1990-02-28").is_ok());
        assert!(validate_birthday("1990-02-30").is_err());
        assert!(validate_birthday("28/02/1990").is_err());
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let service = setup().await;
        service.register("1001", "alice", Some("a@example.com")).await.unwrap();

        let err = service.register("1001", "alice2", None).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let err = service.register("1002", "alice3", Some("a@example.com")).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_register_treats_blank_email_as_none() {
        let service = setup().await;
        let a = service.register("1001", "a", Some("  ")).await.unwrap();
        let b = service.register("1002", "b", Some("")).await.unwrap();
        assert_eq!(a.email, None);
        assert_eq!(b.email, None);
    }

    #[tokio::test]
    async fn test_update_profile_applies_patch() {
        let service = setup().await;
        let user = service.register("1001", "alice", None).await.unwrap();

        let patch = ProfilePatch {
            gender: Some(Gender::Female),
            birthday: Some("1995-06-01".to_string()),
            ..Default::default()
        };
        let updated = service.update_profile(&user.uuid, patch).await.unwrap();

        assert_eq!(updated.gender, Gender::Female);
        assert_eq!(updated.birthday, "1995-06-01");
        assert_eq!(updated.nickname, "alice");
        assert!(updated.updated_at > user.updated_at);

        let err = service.update_profile(&user.uuid, ProfilePatch::default()).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn test_change_phone() {
        let service = setup().await;
        let alice = service.register("1001", "alice", None).await.unwrap();
        service.register("1002", "bob", None).await.unwrap();

        let err = service.change_phone(&alice.uuid, "1002").await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let moved = service.change_phone(&alice.uuid, "1003").await.unwrap();
        assert_eq!(moved.telephone, "1003");
        assert_eq!(moved.nickname, "alice");
        assert_eq!(service.get_by_phone("1003").await.unwrap().uuid, alice.uuid);
        assert!(service.get_by_phone("1001").await.unwrap_err().is_not_found());

        // Same number again is not a conflict with itself
        let same = service.change_phone(&alice.uuid, "1003").await.unwrap();
        assert_eq!(same.telephone, "1003");

        let err = service.change_phone("ghost", "1004").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_stale_snapshot_never_reverts_a_phone_change() {
        let pool = create_migrated_test_pool().await.unwrap();
        let store = Arc::new(StaleReadStore::new(Arc::new(SqliteUserStore::new(pool))));
        let repo = CachedUserRepository::new(
            store.clone(),
            SoftCache::new(Arc::new(RecordingCache::new()), Duration::from_millis(200)),
            UserCachePolicy::default(),
        );
        let service = UserService::new(Arc::new(repo));

        let user = service.register("1001", "alice", None).await.unwrap();
        service.change_phone(&user.uuid, "2002").await.unwrap();

        // A slow reader that loaded the row before the change refills the cache
        store.pin_once(user.clone());
        assert_eq!(service.get_profile(&user.uuid).await.unwrap().telephone, "1001");

        let patch = ProfilePatch {
            signature: Some("hi".to_string()),
            ..Default::default()
        };
        let updated = service.update_profile(&user.uuid, patch).await.unwrap();
        assert_eq!(updated.telephone, "2002");
        assert_eq!(updated.signature, "hi");

        let fresh = service.get_profile(&user.uuid).await.unwrap();
        assert_eq!(fresh.telephone, "2002");
        assert_eq!(service.get_by_phone("2002").await.unwrap().uuid, user.uuid);
        assert!(service.get_by_phone("1001").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_batch_size_is_capped() {
        let service = setup().await;
        let ids: Vec<String> = (0..=MAX_BATCH_SIZE).map(|i| i.to_string()).collect();
        let err = service.batch_get(&ids).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn test_search_requires_keyword() {
        let service = setup().await;
        assert!(service.search("  ", Page::default()).await.is_err());
    }
}
