use crate::api::models::{HealthResponse, StatsResponse};
use crate::core::error::Result;
use axum::{extract::State, Json};
use super::AppState;

/// Handler for GET /health
///
/// Liveness only; the store is never touched.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Handler for GET /stats - password totals per source
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let stats = state.service.stats().await?;
    Ok(Json(stats.into()))
}
