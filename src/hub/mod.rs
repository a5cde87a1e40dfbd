//! Distribution hub: the single authority over live client sessions.
//!
//! ```text
//! EventBridge ──broadcast──┐
//! ws handler ──register────┼──► command queue ──► Hub::run ──try_send──► session queues
//! sessions ───unregister───┘
//! ```

pub mod registry;
pub mod session_id;
pub mod stats;

pub use registry::{Hub, HubHandle};
pub use session_id::SessionId;
pub use stats::HubStats;
