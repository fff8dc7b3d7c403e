//! Roster - identity and relationship store for chat
//!
//! Roster answers "who is this user" and "what changed in my friend list
//! since I last looked", while keeping read load off the relational store.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors, and the storage/cache ports
//! - **Adapters** (`adapters`): SQLite stores, cache backends, and the
//!   cache-aside user repository
//! - **Service Layer** (`services`): business rules and incremental sync
//! - **Infrastructure Layer** (`infrastructure`): configuration, logging, wiring
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use roster::infrastructure::setup::build_context;
//! use roster::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ctx = build_context(&Config::default()).await?;
//!     let alice = ctx.users.register("13800000000", "alice", None).await?;
//!     let page = ctx.friends.sync(&alice.uuid, "0", 100).await?;
//!     println!("{} changes, next cursor {}", page.changes.len(), page.next_cursor);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    CacheBackend, CacheConfig, ChangeType, Config, DatabaseConfig, LoggingConfig, Relation, RelationState,
    RelationStatus, SyncConfig, SyncCursor, SyncPage, User, UserChanges, UserStatus,
};
pub use domain::ports::{CacheClient, RelationStore, UserStore};
pub use domain::{within, DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{FriendService, RelationSyncRepository, UserService};
