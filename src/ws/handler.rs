//! Axum WebSocket upgrade handler.

use axum::extract::State;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::StreamExt;

use super::session::{ClientSession, SessionSettings};
use crate::app_state::AppState;
use crate::hub::HubHandle;

/// `GET /ws`: upgrade HTTP connection to WebSocket and attach it to the hub.
///
/// The inbound size limit is applied at the protocol layer as well, so an
/// oversized frame fails the read instead of being buffered.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let settings = state.session;
    let hub = state.hub;

    ws.max_message_size(settings.max_message_size)
        .max_frame_size(settings.max_message_size)
        .on_upgrade(move |socket| attach(socket, hub, settings))
}

async fn attach(socket: WebSocket, hub: HubHandle, settings: SessionSettings) {
    let (sink, stream) = socket.split();
    let session = ClientSession::new(hub, settings);
    let id = session.id();
    if let Err(err) = session.start(sink, stream).await {
        tracing::warn!(session_id = %id, error = %err, "websocket session not started");
    }
}
