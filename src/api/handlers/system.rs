//! System endpoints: health check.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::error::HubError;
use crate::hub::HubStats;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"healthy"` when the hub answers.
    pub status: String,
    /// RFC 3339 timestamp of the check.
    pub timestamp: String,
    /// Crate version.
    pub version: String,
    /// Live registry counters.
    pub hub: HubStats,
}

/// `GET /health`: service health status and connected client count.
///
/// # Errors
///
/// Returns [`HubError::HubUnavailable`] (503) when the hub control loop
/// has stopped.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health, version, current timestamp and hub statistics.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Hub control loop is not running"),
    )
)]
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, HubError> {
    let hub = state.hub.stats().await?;
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        hub,
    }))
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}
