//! Service layer: business rules over the identity and relationship stores.

pub mod friend_service;
pub mod relation_sync;
pub mod user_service;

pub use friend_service::FriendService;
pub use relation_sync::RelationSyncRepository;
pub use user_service::UserService;

use crate::domain::models::Page;

/// Largest page size served by list and search operations.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Normalize a requested page: page 0 reads as page 1, and sizes are
/// kept within `1..=MAX_PAGE_SIZE`.
pub fn clamp_page(page: Page) -> Page {
    Page::new(page.number.max(1), page.size.clamp(1, MAX_PAGE_SIZE))
}
