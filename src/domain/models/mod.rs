//! Domain models.

pub mod config;
pub mod relation;
pub mod sync;
pub mod user;

pub use config::{CacheBackend, CacheConfig, Config, DatabaseConfig, LoggingConfig, SyncConfig};
pub use relation::{Relation, RelationState, RelationStatus};
pub use sync::{ChangeSlice, ChangeType, RelationChange, SyncCursor, SyncPage};
pub use user::{Gender, Page, ProfilePatch, User, UserChanges, UserStatus, UserUpdate};
