//! Realtime transport abstraction
//!
//! A [`Transport`] carries [`ClientMessage`]s out and yields
//! [`TransportEvent`]s in: lifecycle notices interleaved with decoded server
//! messages, in arrival order. The session code is written against this
//! trait only; [`WebSocketTransport`](super::WebSocketTransport) is the
//! production implementation and [`ChannelTransport`] is an in-memory pair
//! whose far end is driven directly.

use async_trait::async_trait;
use shared::{ClientMessage, ServerMessage};
use tokio::sync::mpsc;

/// Errors that can occur on the realtime channel
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The transport was closed, locally or by its background task
    #[error("Transport closed")]
    Closed,

    /// The server URL could not be parsed
    #[error("Invalid server URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// A message could not be serialized
    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result type alias for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Something that happened on the channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected,
    ConnectError { message: String },
    /// Attempt number `n` (1-based) is about to start
    ReconnectAttempt(u32),
    ReconnectFailed,
    /// Closed for good
    Disconnected,
    Message(ServerMessage),
}

#[async_trait]
pub trait Transport: Send {
    /// Queue a message. Messages sent while the link is down are delivered
    /// in order once it is back.
    fn send(&mut self, message: ClientMessage) -> TransportResult<()>;

    /// Wait for the next event. `None` once the transport is closed and
    /// drained.
    async fn recv(&mut self) -> Option<TransportEvent>;

    /// Next event if one is already waiting
    fn try_recv(&mut self) -> Option<TransportEvent>;

    /// Shut the link down. Idempotent.
    async fn close(&mut self);
}

/// In-memory transport; see [`ChannelTransport::pair`]
pub struct ChannelTransport {
    outbound: mpsc::UnboundedSender<ClientMessage>,
    inbound: mpsc::UnboundedReceiver<TransportEvent>,
    closed: bool,
}

/// The far end of a [`ChannelTransport`]
pub struct ChannelPeer {
    /// Messages the local side sent
    pub sent: mpsc::UnboundedReceiver<ClientMessage>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl ChannelTransport {
    pub fn pair() -> (ChannelTransport, ChannelPeer) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        (
            ChannelTransport {
                outbound: out_tx,
                inbound: in_rx,
                closed: false,
            },
            ChannelPeer {
                sent: out_rx,
                events: in_tx,
            },
        )
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    fn send(&mut self, message: ClientMessage) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.outbound
            .send(message)
            .map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Option<TransportEvent> {
        self.inbound.recv().await
    }

    fn try_recv(&mut self) -> Option<TransportEvent> {
        self.inbound.try_recv().ok()
    }

    async fn close(&mut self) {
        self.closed = true;
        self.inbound.close();
    }
}

impl ChannelPeer {
    /// Push a lifecycle event to the local side
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.events.send(event).is_ok()
    }

    /// Push a server message to the local side
    pub fn deliver(&self, message: ServerMessage) -> bool {
        self.emit(TransportEvent::Message(message))
    }

    /// Next message the local side sent, if any is waiting
    pub fn try_next_sent(&mut self) -> Option<ClientMessage> {
        self.sent.try_recv().ok()
    }

    pub async fn next_sent(&mut self) -> Option<ClientMessage> {
        self.sent.recv().await
    }
}
