//! Infrastructure layer module
//!
//! - Configuration management
//! - Logging infrastructure
//! - Application wiring (database, cache backend, services)

pub mod config;
pub mod logging;
pub mod setup;
