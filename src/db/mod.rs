//! Database module
//!
//! This module provides store access including:
//! - Read-only connection pool management
//! - The credential lookup repository
//! - Schema and wordlist import for the setup path
//! - Data models

pub mod loader;
pub mod manager;
pub mod models;
pub mod repository;
pub mod schema;

pub use loader::{setup_database, SetupReport};
pub use manager::{DatabaseManager, PoolSettings};
pub use models::{CredentialMatch, PasswordStats, SourceCount};
pub use repository::{CredentialRepository, CredentialStore, UnavailableStore};
