//! WebSocket client transport with automatic reconnection
//!
//! A background task owns the socket. It connects, forwards decoded frames
//! as [`TransportEvent::Message`], and on failure retries per
//! [`ReconnectPolicy`], emitting `ConnectError`, `ReconnectAttempt(n)` and
//! finally `ReconnectFailed`. Outbound messages wait in the queue while the
//! link is down. After a reconnect they are flushed in order right behind the
//! next `join-game`, so the relay has seated the connection before any move
//! arrives. A `join-game` left in the backlog is dropped since a fresh one
//! replaces it.

use crate::networking::connection::ReconnectPolicy;
use crate::networking::transport::{Transport, TransportError, TransportEvent, TransportResult};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use http::Uri;
use shared::{ClientMessage, ServerMessage};
use std::collections::VecDeque;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use websocket::{ClientBuilder, MaybeTlsStream, Message, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WebSocketTransport {
    outbound: mpsc::UnboundedSender<ClientMessage>,
    inbound: mpsc::UnboundedReceiver<TransportEvent>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl WebSocketTransport {
    /// Start connecting to `url` (`ws://` or `wss://`) in the background.
    ///
    /// Returns as soon as the URL is validated; the first event is either
    /// `Connected` or `ConnectError`.
    pub fn connect(url: &str, policy: ReconnectPolicy) -> TransportResult<Self> {
        let uri = parse_url(url)?;

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        info!("[TRANSPORT] Connecting to {}", uri);
        let task = tokio::spawn(run_link(uri, policy, out_rx, in_tx, shutdown_rx));

        Ok(Self {
            outbound: out_tx,
            inbound: in_rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }
}

fn parse_url(url: &str) -> TransportResult<Uri> {
    let invalid = |message: String| TransportError::InvalidUrl {
        url: url.to_string(),
        message,
    };
    let uri: Uri = url.parse().map_err(|e: http::uri::InvalidUri| invalid(e.to_string()))?;
    match uri.scheme_str() {
        Some("ws") | Some("wss") => Ok(uri),
        _ => Err(invalid("expected a ws:// or wss:// URL".to_string())),
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    fn send(&mut self, message: ClientMessage) -> TransportResult<()> {
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
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("[TRANSPORT] Link task ended abnormally: {}", e);
            }
        }
    }
}

enum LinkEnd {
    Shutdown,
    Lost(String),
}

async fn run_link(
    uri: Uri,
    policy: ReconnectPolicy,
    mut outbound: mpsc::UnboundedReceiver<ClientMessage>,
    events: mpsc::UnboundedSender<TransportEvent>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut backlog: VecDeque<ClientMessage> = VecDeque::new();
    let mut attempt = 0u32;

    loop {
        let builder = ClientBuilder::from_uri(uri.clone());
        let result = tokio::select! {
            _ = &mut shutdown => break,
            result = builder.connect() => result,
        };

        match result {
            Ok((socket, _)) => {
                attempt = 0;
                info!("[TRANSPORT] Connected to {}", uri);
                // Anything queued while offline waits for the next join-game
                while let Ok(message) = outbound.try_recv() {
                    backlog.push_back(message);
                }
                backlog.retain(|message| !matches!(message, ClientMessage::JoinGame { .. }));
                if events.send(TransportEvent::Connected).is_err() {
                    break;
                }
                match pump_link(socket, &mut outbound, &events, &mut backlog, &mut shutdown).await {
                    LinkEnd::Shutdown => break,
                    LinkEnd::Lost(message) => {
                        warn!("[TRANSPORT] Link lost: {}", message);
                        let _ = events.send(TransportEvent::ConnectError { message });
                    }
                }
            }
            Err(e) => {
                warn!("[TRANSPORT] Connect to {} failed: {}", uri, e);
                let _ = events.send(TransportEvent::ConnectError {
                    message: e.to_string(),
                });
            }
        }

        attempt += 1;
        if attempt > policy.attempts {
            warn!("[TRANSPORT] Giving up after {} attempts", policy.attempts);
            let _ = events.send(TransportEvent::ReconnectFailed);
            return;
        }

        tokio::select! {
            _ = &mut shutdown => break,
            _ = tokio::time::sleep(policy.delay()) => {}
        }
        debug!("[TRANSPORT] Reconnect attempt {}/{}", attempt, policy.attempts);
        let _ = events.send(TransportEvent::ReconnectAttempt(attempt));
    }

    info!("[TRANSPORT] Closed");
    let _ = events.send(TransportEvent::Disconnected);
}

async fn send_frame(socket: &mut Socket, message: &ClientMessage) -> Result<(), String> {
    match message.encode() {
        Ok(frame) => socket.send(Message::text(frame)).await.map_err(|e| e.to_string()),
        Err(e) => {
            warn!("[TRANSPORT] Dropping unencodable message: {}", e);
            Ok(())
        }
    }
}

/// Shuttle frames until the link drops or shutdown is requested
async fn pump_link(
    mut socket: Socket,
    outbound: &mut mpsc::UnboundedReceiver<ClientMessage>,
    events: &mpsc::UnboundedSender<TransportEvent>,
    backlog: &mut VecDeque<ClientMessage>,
    shutdown: &mut oneshot::Receiver<()>,
) -> LinkEnd {
    let mut seated = backlog.is_empty();

    loop {
        tokio::select! {
            _ = &mut *shutdown => {
                let _ = socket.close().await;
                return LinkEnd::Shutdown;
            }
            outgoing = outbound.recv() => {
                let Some(message) = outgoing else {
                    let _ = socket.close().await;
                    return LinkEnd::Shutdown;
                };
                let rejoined = matches!(message, ClientMessage::JoinGame { .. });
                if !seated && !rejoined {
                    backlog.push_back(message);
                    continue;
                }
                if let Err(e) = send_frame(&mut socket, &message).await {
                    backlog.push_back(message);
                    return LinkEnd::Lost(e);
                }
                if rejoined && !seated {
                    seated = true;
                    debug!("[TRANSPORT] Replaying {} queued messages", backlog.len());
                    while let Some(queued) = backlog.pop_front() {
                        if let Err(e) = send_frame(&mut socket, &queued).await {
                            backlog.push_front(queued);
                            return LinkEnd::Lost(e);
                        }
                    }
                }
            }
            incoming = socket.next() => match incoming {
                Some(Ok(message)) => {
                    if let Some(text) = message.as_text() {
                        match ServerMessage::decode(text) {
                            Ok(decoded) => {
                                if events.send(TransportEvent::Message(decoded)).is_err() {
                                    return LinkEnd::Shutdown;
                                }
                            }
                            Err(e) => warn!("[TRANSPORT] Ignoring malformed frame '{}': {}", text, e),
                        }
                    } else if message.is_close() {
                        return LinkEnd::Lost("closed by server".to_string());
                    }
                }
                Some(Err(e)) => return LinkEnd::Lost(e.to_string()),
                None => return LinkEnd::Lost("stream ended".to_string()),
            }
        }
    }
}
