//! Credential Checker Library
//!
//! This library provides the core functionality for the credential checker,
//! including match query construction, the read-only credential store, rate
//! limited request admission and the REST API.

pub mod api;
pub mod core;
pub mod db;

// Re-export commonly used types
pub use api::ApiServer;
pub use crate::core::{CheckerError, Config};
pub use db::DatabaseManager;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
