use crate::api::models::{rejection_to_validation, SearchRequest, StringMatch};
use crate::core::error::Result;
use crate::core::query::CredentialTable;
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::HeaderMap,
    Json,
};
use std::net::SocketAddr;
use super::AppState;

/// Validate, admit, then look up.
///
/// Validation comes first so malformed requests never consume a rate limit slot.
async fn search(
    state: &AppState,
    table: CredentialTable,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: &HeaderMap,
    body: std::result::Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<Vec<StringMatch>>> {
    let Json(request) = body.map_err(rejection_to_validation)?;
    let params = request.validate()?;

    let client_ip = state
        .rate_limiter
        .client_ip(headers, peer.map(|ConnectInfo(addr)| addr));
    state.rate_limiter.check_rate_limit(client_ip).await?;

    let matches = state.service.search(table, &params).await?;
    Ok(Json(matches.into_iter().map(StringMatch::from).collect()))
}

/// Handler for POST /search/password (alias POST /password)
pub async fn search_passwords(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: std::result::Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<Vec<StringMatch>>> {
    search(&state, CredentialTable::Passwords, peer, &headers, body).await
}

/// Handler for POST /search/username (alias POST /username)
pub async fn search_usernames(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: std::result::Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<Vec<StringMatch>>> {
    search(&state, CredentialTable::Usernames, peer, &headers, body).await
}
