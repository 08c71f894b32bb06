//! WebSocket endpoint of the relay
//!
//! Each connection gets a reader loop (this task) and a writer task fed by an
//! [`Outbox`]. Rooms only ever push into outboxes, so a slow socket never
//! blocks the room lock. After the socket closes the task lingers for the
//! rejoin grace to expire a held seat.

use crate::rooms::{ConnectionId, GameRooms, Outbox};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use shared::{ClientMessage, RoomCode, ServerMessage};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// How long a dropped player's seat is held by default
pub const DEFAULT_REJOIN_GRACE: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct RelayState {
    rooms: Arc<Mutex<GameRooms>>,
    next_id: Arc<AtomicU64>,
    rejoin_grace: Duration,
}

impl Default for RelayState {
    fn default() -> Self {
        Self::new(DEFAULT_REJOIN_GRACE)
    }
}

impl RelayState {
    pub fn new(rejoin_grace: Duration) -> Self {
        Self {
            rooms: Arc::new(Mutex::new(GameRooms::new())),
            next_id: Arc::new(AtomicU64::new(0)),
            rejoin_grace,
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.lock().room_count()
    }
}

pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Serve the relay on an already bound listener until the task is dropped
pub async fn serve(listener: TcpListener, state: RelayState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("[RELAY] Listening on {}", addr);
    }
    axum::serve(listener, router(state)).await
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<RelayState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: RelayState) {
    let id = state.next_id.fetch_add(1, Ordering::Relaxed);
    debug!("[RELAY] Connection {} opened", id);

    let (mut sink, mut stream) = socket.split();
    let (outbox, mut queued) = mpsc::unbounded_channel::<ServerMessage>();

    let writer = tokio::spawn(async move {
        while let Some(message) = queued.recv().await {
            let frame = match message.encode() {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("[RELAY] Failed to encode {:?}: {}", message, e);
                    continue;
                }
            };
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => handle_frame(&state, id, &outbox, text.as_str()),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("[RELAY] Connection {} errored: {}", id, e);
                break;
            }
        }
    }

    writer.abort();
    debug!("[RELAY] Connection {} closed", id);

    let vacancy = state.rooms.lock().leave(id);
    if let Some(vacancy) = vacancy {
        tokio::time::sleep(state.rejoin_grace).await;
        if state.rooms.lock().expire(&vacancy) {
            info!("[RELAY] Nobody rejoined room {} in time", vacancy.code);
        }
    }
}

fn handle_frame(state: &RelayState, id: ConnectionId, outbox: &Outbox, text: &str) {
    match ClientMessage::decode(text) {
        Ok(ClientMessage::JoinGame { code }) => {
            let code = RoomCode::from_wire(code);
            state.rooms.lock().join(id, outbox.clone(), code);
        }
        Ok(ClientMessage::Move(payload)) => {
            state.rooms.lock().relay_move(id, payload);
        }
        Err(e) => warn!("[RELAY] Ignoring malformed frame from {}: {}", id, e),
    }
}
