//! Domain layer for the roster store
//!
//! Identity and relationship models, the error taxonomy, and the ports
//! that storage and cache adapters implement.

pub mod deadline;
pub mod errors;
pub mod models;
pub mod ports;

pub use deadline::within;
pub use errors::{DomainError, DomainResult};
