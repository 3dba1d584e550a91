pub mod search;
pub mod system;

pub use search::*;
pub use system::*;

use crate::api::middleware::RateLimiter;
use crate::core::services::CredentialService;
use std::sync::Arc;

/// Shared application state for handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CredentialService>,
    pub rate_limiter: RateLimiter,
}
