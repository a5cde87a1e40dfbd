//! Per-connection session: inbound drain and outbound delivery loops.
//!
//! A [`ClientSession`] registers an outbound queue with the hub and then
//! runs two independent tasks over the split connection:
//!
//! - the **read loop** drains client frames, enforces the inbound size
//!   limit and treats a missing pong within `pong_wait` as a dead peer;
//! - the **write loop** flushes queued payloads (coalescing whatever is
//!   already waiting into one frame) and sends a ping every `ping_period`.
//!
//! Either loop ending deregisters the session. The read loop ending makes
//! the hub close the queue, which stops the write loop; the write loop
//! ending drops a oneshot that stops the read loop.

use std::fmt::Display;
use std::time::Duration;

use axum::extract::ws::Message;
use bytes::Bytes;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::error::HubError;
use crate::hub::{HubHandle, SessionId};

/// Separator placed between payloads coalesced into one frame.
pub const FRAME_DELIMITER: u8 = b'\n';

/// Timeouts, limits and queue sizing applied to every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// How long the read loop waits for a pong before giving up on the peer.
    pub pong_wait: Duration,
    /// Interval between pings. Must be shorter than `pong_wait`.
    pub ping_period: Duration,
    /// Deadline for each individual write.
    pub write_wait: Duration,
    /// Largest inbound message accepted, in bytes.
    pub max_message_size: usize,
    /// Capacity of the outbound queue the hub pushes into.
    pub queue_capacity: usize,
}

impl SessionSettings {
    /// Builds settings from a pong window, deriving the ping period as
    /// nine tenths of it so a ping always lands inside the peer's window.
    #[must_use]
    pub fn from_pong_wait(
        pong_wait: Duration,
        write_wait: Duration,
        max_message_size: usize,
        queue_capacity: usize,
    ) -> Self {
        Self {
            pong_wait,
            ping_period: pong_wait * 9 / 10,
            write_wait,
            max_message_size,
            queue_capacity: queue_capacity.max(1),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_pong_wait(Duration::from_secs(60), Duration::from_secs(10), 512, 256)
    }
}

/// Why one of the session loops stopped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionEnd {
    /// The hub closed the outbound queue (unregistered, shed, or stopped).
    #[error("outbound queue closed by hub")]
    QueueClosed,
    /// No pong arrived within the read window.
    #[error("no pong within the read window")]
    PongTimeout,
    /// A write did not complete within the write deadline.
    #[error("write deadline exceeded")]
    WriteTimeout,
    /// The client sent a message over the size limit.
    #[error("inbound message of {0} bytes exceeds the limit")]
    Oversized(usize),
    /// The client sent a close frame or the stream ended.
    #[error("peer closed the connection")]
    PeerClosed,
    /// The companion loop of this session has already stopped.
    #[error("companion loop stopped")]
    CompanionStopped,
    /// Reading or writing failed at the transport level.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Join handles of a started session's two loops.
#[derive(Debug)]
pub struct SessionTasks {
    /// Inbound drain loop.
    pub reader: JoinHandle<SessionEnd>,
    /// Outbound delivery and keepalive loop.
    pub writer: JoinHandle<SessionEnd>,
}

/// One client connection bound to the hub.
#[derive(Debug)]
pub struct ClientSession {
    id: SessionId,
    hub: HubHandle,
    settings: SessionSettings,
}

impl ClientSession {
    /// Creates an unregistered session with a fresh id.
    #[must_use]
    pub fn new(hub: HubHandle, settings: SessionSettings) -> Self {
        Self {
            id: SessionId::new(),
            hub,
            settings,
        }
    }

    /// Returns the registry id of this session.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Registers the session with the hub and spawns both loops over the
    /// given halves of the connection.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::HubUnavailable`] if the hub has stopped; the
    /// connection halves are dropped without starting any loop.
    pub async fn start<W, R, WE, RE>(self, sink: W, stream: R) -> Result<SessionTasks, HubError>
    where
        W: Sink<Message, Error = WE> + Unpin + Send + 'static,
        R: Stream<Item = Result<Message, RE>> + Unpin + Send + 'static,
        WE: Display + Send + 'static,
        RE: Display + Send + 'static,
    {
        let (queue_tx, queue_rx) = mpsc::channel(self.settings.queue_capacity.max(1));
        self.hub.register(self.id, queue_tx).await?;

        let (writer_alive, writer_gone) = oneshot::channel();
        let writer = tokio::spawn(write_loop(
            self.id,
            sink,
            queue_rx,
            self.hub.clone(),
            self.settings,
            writer_alive,
        ));
        let reader = tokio::spawn(read_loop(
            self.id,
            stream,
            self.hub,
            self.settings,
            writer_gone,
        ));
        Ok(SessionTasks { reader, writer })
    }
}

async fn read_loop<R, E>(
    id: SessionId,
    mut stream: R,
    hub: HubHandle,
    settings: SessionSettings,
    mut writer_gone: oneshot::Receiver<()>,
) -> SessionEnd
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let mut deadline = Instant::now() + settings.pong_wait;
    let end = loop {
        let next = tokio::select! {
            _ = &mut writer_gone => break SessionEnd::CompanionStopped,
            next = tokio::time::timeout_at(deadline, stream.next()) => next,
        };
        let message = match next {
            Err(_) => break SessionEnd::PongTimeout,
            Ok(None) => break SessionEnd::PeerClosed,
            Ok(Some(Err(err))) => break SessionEnd::Transport(err.to_string()),
            Ok(Some(Ok(message))) => message,
        };
        match message {
            Message::Pong(_) => deadline = Instant::now() + settings.pong_wait,
            Message::Close(_) => break SessionEnd::PeerClosed,
            Message::Text(text) => {
                let size = text.as_str().len();
                if size > settings.max_message_size {
                    break SessionEnd::Oversized(size);
                }
                debug!(session_id = %id, bytes = size, "received from client");
            }
            Message::Binary(data) => {
                if data.len() > settings.max_message_size {
                    break SessionEnd::Oversized(data.len());
                }
                debug!(session_id = %id, bytes = data.len(), "received from client");
            }
            Message::Ping(_) => {}
        }
    };

    hub.unregister(id).await;
    log_end(id, "read", &end);
    end
}

async fn write_loop<W, E>(
    id: SessionId,
    mut sink: W,
    mut queue: mpsc::Receiver<Bytes>,
    hub: HubHandle,
    settings: SessionSettings,
    _alive: oneshot::Sender<()>,
) -> SessionEnd
where
    W: Sink<Message, Error = E> + Unpin,
    E: Display,
{
    let mut ping = tokio::time::interval_at(
        Instant::now() + settings.ping_period,
        settings.ping_period,
    );
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let end = loop {
        tokio::select! {
            next = queue.recv() => {
                let Some(first) = next else {
                    let _ = send_with_deadline(&mut sink, Message::Close(None), settings.write_wait).await;
                    break SessionEnd::QueueClosed;
                };
                let (frame, payloads) = coalesce(first, &mut queue);
                if let Err(end) = send_with_deadline(&mut sink, frame, settings.write_wait).await {
                    break end;
                }
                debug!(session_id = %id, payloads, "frame flushed");
            }
            _ = ping.tick() => {
                if let Err(end) = send_with_deadline(&mut sink, Message::Ping(Bytes::new()), settings.write_wait).await {
                    break end;
                }
            }
        }
    };

    hub.unregister(id).await;
    let _ = tokio::time::timeout(settings.write_wait, sink.close()).await;
    log_end(id, "write", &end);
    end
}

/// Joins `first` and every payload already waiting in `queue` into a single
/// frame, returning it with the number of payloads it carries.
///
/// Only payloads present when this is called are taken; anything arriving
/// later starts the next frame. Payloads that together are not valid UTF-8
/// cannot ride a text frame and are sent as binary instead.
fn coalesce(first: Bytes, queue: &mut mpsc::Receiver<Bytes>) -> (Message, usize) {
    let pending = queue.len();
    let mut buf = first.to_vec();
    let mut payloads = 1;
    for _ in 0..pending {
        let Ok(next) = queue.try_recv() else {
            break;
        };
        buf.push(FRAME_DELIMITER);
        buf.extend_from_slice(&next);
        payloads += 1;
    }
    (into_frame(buf), payloads)
}

fn into_frame(buf: Vec<u8>) -> Message {
    match String::from_utf8(buf) {
        Ok(text) => Message::text(text),
        Err(err) => Message::binary(err.into_bytes()),
    }
}

async fn send_with_deadline<W, E>(
    sink: &mut W,
    message: Message,
    write_wait: Duration,
) -> Result<(), SessionEnd>
where
    W: Sink<Message, Error = E> + Unpin,
    E: Display,
{
    match tokio::time::timeout(write_wait, sink.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(SessionEnd::Transport(err.to_string())),
        Err(_) => Err(SessionEnd::WriteTimeout),
    }
}

fn log_end(id: SessionId, side: &'static str, end: &SessionEnd) {
    match end {
        SessionEnd::Transport(_) | SessionEnd::Oversized(_) | SessionEnd::WriteTimeout => {
            warn!(session_id = %id, side, reason = %end, "session loop ended");
        }
        _ => debug!(session_id = %id, side, reason = %end, "session loop ended"),
    }
}
