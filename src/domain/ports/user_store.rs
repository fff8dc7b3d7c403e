//! Identity store port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Page, User, UserChanges, UserUpdate};

/// Persistence interface for identity records.
///
/// Implemented by the SQLite store and by the cache-aside decorator
/// that wraps it.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. `Conflict` if the phone or email is taken.
    async fn create(&self, user: &User) -> DomainResult<User>;

    /// `NotFound` if no user carries this identifier.
    async fn get_by_uuid(&self, uuid: &str) -> DomainResult<User>;

    /// `NotFound` if no user carries this phone number.
    async fn get_by_phone(&self, telephone: &str) -> DomainResult<User>;

    /// Fetch every user among `uuids` that exists. Unknown ids are skipped.
    async fn get_many(&self, uuids: &[String]) -> DomainResult<Vec<User>>;

    /// Write the fields set in `changes` and advance `updated_at`; every
    /// other column keeps its stored value. `NotFound` for an unknown
    /// identifier, `Conflict` if the new phone number is taken.
    async fn update(&self, uuid: &str, changes: &UserChanges) -> DomainResult<UserUpdate>;

    async fn exists_by_phone(&self, telephone: &str) -> DomainResult<bool>;

    async fn exists_by_email(&self, email: &str) -> DomainResult<bool>;

    /// Active users whose phone or nickname contains `keyword`, newest
    /// first, with the total match count.
    async fn search(&self, keyword: &str, page: Page) -> DomainResult<(Vec<User>, u64)>;
}
