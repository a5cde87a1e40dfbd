//! Hub control loop and its cloneable handle.
//!
//! [`Hub`] owns the registry of live sessions. It runs as a single task fed
//! by one FIFO command queue, so registration, deregistration and broadcast
//! delivery are applied one at a time and in the order each caller issued
//! them. [`HubHandle`] is the only way in.
//!
//! Delivery never waits on a session: each payload is offered to every
//! outbound queue with `try_send`, and a session whose queue is full is
//! removed from the registry on the spot. Removing a session drops the
//! hub's sender, which is what closes that session's queue; its write loop
//! flushes whatever was already buffered and then exits.

use std::collections::HashMap;

use bytes::Bytes;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::{HubStats, SessionId};
use crate::error::HubError;

/// Requests handled by the control loop, in arrival order.
#[derive(Debug)]
enum Command {
    Register {
        id: SessionId,
        queue: mpsc::Sender<Bytes>,
        ack: oneshot::Sender<()>,
    },
    Unregister(SessionId),
    Broadcast(Bytes),
    Contains {
        id: SessionId,
        reply: oneshot::Sender<bool>,
    },
    Stats(oneshot::Sender<HubStats>),
    Shutdown,
}

/// The registry of sessions eligible to receive broadcasts.
///
/// Only [`Hub::run`] reads or mutates the registry. Construct with
/// [`Hub::new`], move the hub into its own task and hand out clones of the
/// returned [`HubHandle`].
#[derive(Debug)]
pub struct Hub {
    sessions: HashMap<SessionId, mpsc::Sender<Bytes>>,
    commands: mpsc::Receiver<Command>,
    broadcasts: u64,
    shed: u64,
}

impl Hub {
    /// Creates a hub whose command queue holds up to `queue_capacity`
    /// pending requests. A capacity of zero is treated as one.
    #[must_use]
    pub fn new(queue_capacity: usize) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let hub = Self {
            sessions: HashMap::new(),
            commands: rx,
            broadcasts: 0,
            shed: 0,
        };
        (hub, HubHandle { commands: tx })
    }

    /// Creates a hub and spawns its control loop on the current runtime.
    #[must_use]
    pub fn spawn(queue_capacity: usize) -> HubHandle {
        let (hub, handle) = Self::new(queue_capacity);
        tokio::spawn(hub.run());
        handle
    }

    /// Runs the control loop until [`HubHandle::shutdown`] is called or
    /// every handle has been dropped.
    ///
    /// On exit every remaining session queue is closed, which makes each
    /// session send a close frame and end.
    pub async fn run(mut self) {
        info!("hub control loop started");
        while let Some(command) = self.commands.recv().await {
            if let Command::Shutdown = command {
                break;
            }
            self.apply(command);
        }
        self.commands.close();
        let remaining = self.sessions.len();
        self.sessions.clear();
        info!(clients = remaining, "hub control loop stopped");
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Register { id, queue, ack } => {
                self.sessions.insert(id, queue);
                info!(session_id = %id, clients = self.sessions.len(), "client connected");
                let _ = ack.send(());
            }
            Command::Unregister(id) => {
                if self.sessions.remove(&id).is_some() {
                    info!(session_id = %id, clients = self.sessions.len(), "client disconnected");
                }
            }
            Command::Broadcast(payload) => self.deliver(&payload),
            Command::Contains { id, reply } => {
                let _ = reply.send(self.sessions.contains_key(&id));
            }
            Command::Stats(reply) => {
                let _ = reply.send(self.stats());
            }
            Command::Shutdown => {}
        }
    }

    fn deliver(&mut self, payload: &Bytes) {
        self.broadcasts += 1;
        let mut shed = 0u64;
        self.sessions
            .retain(|id, queue| match queue.try_send(payload.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!(session_id = %id, "outbound queue full, shedding slow client");
                    shed += 1;
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(session_id = %id, "outbound queue already closed, dropping client");
                    false
                }
            });
        self.shed += shed;
        debug!(
            clients = self.sessions.len(),
            bytes = payload.len(),
            shed,
            "broadcast delivered"
        );
    }

    fn stats(&self) -> HubStats {
        HubStats {
            clients: self.sessions.len(),
            broadcasts: self.broadcasts,
            shed: self.shed,
        }
    }
}

/// Cloneable entry point into a running [`Hub`].
///
/// Every method enqueues one command; commands issued in sequence by the
/// same caller are applied in that sequence.
#[derive(Debug, Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<Command>,
}

impl HubHandle {
    /// Adds a session and its outbound queue to the registry.
    ///
    /// Resolves once the hub has applied the registration, so any broadcast
    /// issued afterwards reaches the session. Registering an id that is
    /// already present replaces (and closes) the previous queue.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::HubUnavailable`] if the control loop has stopped.
    pub async fn register(
        &self,
        id: SessionId,
        queue: mpsc::Sender<Bytes>,
    ) -> Result<(), HubError> {
        let (ack, applied) = oneshot::channel();
        self.send(Command::Register { id, queue, ack }).await?;
        applied.await.map_err(|_| HubError::HubUnavailable)
    }

    /// Removes a session from the registry and closes its outbound queue.
    ///
    /// Unknown ids are ignored, and so is a stopped hub (it has already
    /// closed every queue), which makes this safe to call from every exit
    /// path of a session.
    pub async fn unregister(&self, id: SessionId) {
        let _ = self.commands.send(Command::Unregister(id)).await;
    }

    /// Queues `payload` for delivery to every registered session.
    ///
    /// Waits only for room in the hub's command queue, never for any
    /// session.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::HubUnavailable`] if the control loop has stopped.
    pub async fn broadcast(&self, payload: impl Into<Bytes>) -> Result<(), HubError> {
        self.send(Command::Broadcast(payload.into())).await
    }

    /// Reports whether `id` is currently registered.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::HubUnavailable`] if the control loop has stopped.
    pub async fn is_registered(&self, id: SessionId) -> Result<bool, HubError> {
        let (reply, answer) = oneshot::channel();
        self.send(Command::Contains { id, reply }).await?;
        answer.await.map_err(|_| HubError::HubUnavailable)
    }

    /// Returns a snapshot of the registry counters.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::HubUnavailable`] if the control loop has stopped.
    pub async fn stats(&self) -> Result<HubStats, HubError> {
        let (reply, answer) = oneshot::channel();
        self.send(Command::Stats(reply)).await?;
        answer.await.map_err(|_| HubError::HubUnavailable)
    }

    /// Stops the control loop after the commands already queued. Commands
    /// queued behind the shutdown are discarded.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }

    async fn send(&self, command: Command) -> Result<(), HubError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| HubError::HubUnavailable)
    }
}
