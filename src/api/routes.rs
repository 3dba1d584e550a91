//! API routes

use crate::api::handlers::{get_stats, health_check, search_passwords, search_usernames, AppState};
use axum::{
    routing::{get, post},
    Router,
};

/// Build the API routes
///
/// `/password` and `/username` are kept as aliases of the `/search/*` routes
/// for older clients.
pub fn build_api_routes(state: AppState) -> Router {
    Router::new()
        .route("/search/password", post(search_passwords))
        .route("/search/username", post(search_usernames))
        .route("/password", post(search_passwords))
        .route("/username", post(search_usernames))
        .route("/stats", get(get_stats))
        .route("/health", get(health_check))
        .with_state(state)
}
