//! Forwards broker messages into the hub's broadcast path.
//!
//! The bridge is byte-oriented on purpose: it never decodes the payload,
//! so producers can evolve the event schema without touching this code.

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tracing::{debug, info};

use crate::error::HubError;
use crate::hub::HubHandle;

/// A message delivered by the broker subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    /// Concrete subject the message was published on (e.g. `tasks.created`).
    pub subject: String,
    /// Raw payload bytes, forwarded as-is.
    pub payload: Bytes,
}

/// Pumps a stream of [`BrokerMessage`]s into [`HubHandle::broadcast`].
#[derive(Debug, Clone)]
pub struct EventBridge {
    hub: HubHandle,
}

impl EventBridge {
    /// Creates a bridge feeding the given hub.
    #[must_use]
    pub const fn new(hub: HubHandle) -> Self {
        Self { hub }
    }

    /// Forwards every message until the stream ends, returning how many
    /// payloads were handed to the hub.
    ///
    /// Backpressure comes from the hub's command queue: while it is full,
    /// the bridge stops pulling from the broker.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::HubUnavailable`] if the hub stops while the
    /// subscription is still delivering.
    pub async fn run<S>(&self, mut messages: S) -> Result<u64, HubError>
    where
        S: Stream<Item = BrokerMessage> + Unpin,
    {
        let mut forwarded = 0u64;
        while let Some(message) = messages.next().await {
            debug!(
                subject = %message.subject,
                bytes = message.payload.len(),
                "broker event received"
            );
            self.hub.broadcast(message.payload).await?;
            forwarded += 1;
        }
        info!(forwarded, "broker subscription ended");
        Ok(forwarded)
    }
}
