//! Core application module
//!
//! This module provides the core application layer including:
//! - Match query construction
//! - The credential lookup service
//! - Configuration management
//! - Structured logging system
//! - Error handling and type system

pub mod config;
pub mod error;
pub mod logging;
pub mod query;
pub mod services;

pub use config::Config;
pub use error::{CheckerError, ErrorContext, ErrorResponse, Result};
pub use logging::Logger;
pub use query::{CredentialTable, MatchMode, MatchQuery};
pub use services::{CredentialService, SearchParams};
