//! Roster configuration: YAML files layered under `ROSTER_` environment
//! overrides, checked by [`ConfigLoader::validate`] before use.

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
