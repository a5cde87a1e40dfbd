//! Event bridge: broker subscription feeding hub broadcasts.
//!
//! [`nats`] opens the one long-lived wildcard subscription;
//! [`EventBridge`] forwards each message's payload, untouched, to the hub.

pub mod event_bridge;
pub mod nats;

pub use event_bridge::{BrokerMessage, EventBridge};
