//! Shared application state injected into all Axum handlers.

use crate::hub::HubHandle;
use crate::ws::SessionSettings;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Handle to the running distribution hub.
    pub hub: HubHandle,
    /// Limits and timeouts applied to every WebSocket session.
    pub session: SessionSettings,
}
