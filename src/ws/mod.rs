//! WebSocket layer: connection upgrade and per-client delivery sessions.
//!
//! The endpoint at `/ws` is push-only: clients receive every task event
//! the hub broadcasts, as text frames of newline-joined JSON envelopes.
//! Anything a client sends is drained and discarded.

pub mod handler;
pub mod session;

pub use session::{ClientSession, SessionEnd, SessionSettings, SessionTasks};
