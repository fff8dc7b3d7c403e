//! CLI command implementations.

pub mod block;
pub mod friend;
pub mod init;
pub mod user;
