//! # taskboard-hub
//!
//! Real-time distribution hub for task events. A single NATS wildcard
//! subscription feeds every event published by the task service to all
//! connected WebSocket clients.
//!
//! ## Architecture
//!
//! ```text
//! task service ──publish tasks.<kind>──► NATS
//!                                          │
//!                              EventBridge (bridge/)
//!                                          │ broadcast
//!                                  Hub control loop (hub/)
//!                                          │ try_send, shed when full
//!               ClientSession write loop ×N (ws/) ──► WebSocket clients
//! ```
//!
//! Delivery is at-most-once and best effort: a session that cannot keep
//! up is dropped rather than allowed to delay the others, and nothing is
//! replayed to clients that connect later.

pub mod api;
pub mod app_state;
pub mod bridge;
pub mod config;
pub mod domain;
pub mod error;
pub mod hub;
pub mod ws;

use axum::Router;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Builds the full application router: HTTP endpoints plus `GET /ws`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws::handler::ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
