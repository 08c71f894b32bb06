//! Session synchronizer - one realtime channel to the remote player
//!
//! # Architecture
//!
//! The synchronizer owns the transport and the session facts (connection
//! state, whether the game has started, whether the opponent left). It does
//! NOT own the position: the caller passes the single current
//! [`Position`] into [`SessionSynchronizer::handle_event`], and the
//! synchronizer replaces it only when the rules adapter accepts a remote
//! move. An unverified remote claim never overwrites local state.
//!
//! # Event handling
//!
//! | Event                   | Effect                                             |
//! |-------------------------|----------------------------------------------------|
//! | connected               | send `join-game`, or flag the session as errored   |
//! | `start-game`            | `game_started = true`                              |
//! | `new-move`              | validate and apply to the position, or warn + drop |
//! | reconnected             | `game_started = false` until `start-game` repeats  |
//! | `opponent-disconnected` | the game is over; the transport keeps running      |
//! | connect-error / reconnect-attempt / reconnect-failed | connection state only |
//!
//! # Ordering
//!
//! Moves carry no sequence number. A local move and an incoming remote move
//! are applied in whichever order the caller processes them, and a remote
//! move that no longer fits the position is rejected like any other illegal
//! move. Once the position is terminal or the opponent has left, every remote
//! move is rejected.

use crate::game::error::{GameError, GameResult};
use crate::game::rules::Position;
use crate::game::status::OverReason;
use crate::game::types::{ChessMove, PlayerColor};
use crate::networking::connection::ConnectionState;
use crate::networking::transport::{Transport, TransportEvent};
use shared::{ClientMessage, MovePayload, RoomCode, ServerMessage};
use tracing::{debug, info, warn};

/// What a handled event changed, for the caller to react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    ConnectionChanged(ConnectionState),
    /// Connected without a room to join
    NoRoom,
    GameStarted,
    RemoteMoveApplied(ChessMove),
    /// A remote move was dropped; the position is unchanged
    RemoteMoveRejected { payload: MovePayload, reason: String },
    OpponentDisconnected,
    ServerError(String),
}

pub struct SessionSynchronizer {
    transport: Option<Box<dyn Transport>>,
    room: Option<RoomCode>,
    local_color: PlayerColor,
    connection: ConnectionState,
    game_started: bool,
    opponent_disconnected: bool,
    errored: bool,
}

impl SessionSynchronizer {
    pub fn new(room: Option<RoomCode>, local_color: PlayerColor) -> Self {
        Self {
            transport: None,
            room,
            local_color,
            connection: ConnectionState::Disconnected,
            game_started: false,
            opponent_disconnected: false,
            errored: false,
        }
    }

    /// Attach a transport that is starting to connect
    pub fn open(&mut self, transport: Box<dyn Transport>) {
        self.transport = Some(transport);
        self.connection = ConnectionState::Connecting;
        self.errored = false;
    }

    /// Close and drop the transport
    pub async fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close().await;
            info!("[SESSION] Closed");
        }
        self.connection = ConnectionState::Disconnected;
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn game_started(&self) -> bool {
        self.game_started
    }

    pub fn opponent_disconnected(&self) -> bool {
        self.opponent_disconnected
    }

    /// Connected without a room code
    pub fn is_errored(&self) -> bool {
        self.errored
    }

    pub fn room(&self) -> Option<&RoomCode> {
        self.room.as_ref()
    }

    pub fn local_color(&self) -> PlayerColor {
        self.local_color
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Wait for the next transport event. `None` when no transport is
    /// attached or it has shut down.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        match self.transport.as_mut() {
            Some(transport) => transport.recv().await,
            None => None,
        }
    }

    /// Next transport event if one is already waiting
    pub fn try_next_event(&mut self) -> Option<TransportEvent> {
        self.transport.as_mut().and_then(|t| t.try_recv())
    }

    /// Broadcast a move the local rules adapter already accepted
    pub fn send_local_move(&mut self, m: &ChessMove) -> GameResult<()> {
        let transport = self.transport.as_mut().ok_or(GameError::AwaitingPeer)?;
        transport.send(ClientMessage::Move(MovePayload::from(m)))?;
        debug!("[SESSION] Sent move {}", m);
        Ok(())
    }

    /// Apply one transport event to the session and, for remote moves, to
    /// `position`
    pub fn handle_event(
        &mut self,
        event: TransportEvent,
        position: &mut Position,
    ) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        match event {
            TransportEvent::Message(message) => {
                updates.push(self.handle_message(message, position));
            }
            lifecycle => {
                let previous = self.connection;
                self.connection = previous.on_event(&lifecycle);
                if self.connection != previous {
                    info!("[SESSION] Connection {:?} -> {:?}", previous, self.connection);
                    updates.push(SessionUpdate::ConnectionChanged(self.connection));
                }
                if lifecycle == TransportEvent::Connected {
                    if previous == ConnectionState::Reconnecting && self.game_started {
                        // The relay confirms the seat again with a fresh start-game
                        info!("[SESSION] Rejoining after reconnect, waiting for start-game");
                        self.game_started = false;
                    }
                    updates.extend(self.join_room());
                }
            }
        }
        updates
    }

    fn join_room(&mut self) -> Option<SessionUpdate> {
        let Some(room) = &self.room else {
            warn!("[SESSION] Connected but no room code was given");
            self.errored = true;
            return Some(SessionUpdate::NoRoom);
        };
        let join = ClientMessage::JoinGame {
            code: room.as_str().to_string(),
        };
        info!("[SESSION] Joining room {}", room);
        let transport = self.transport.as_mut()?;
        if let Err(e) = transport.send(join) {
            warn!("[SESSION] Failed to send join-game: {}", e);
        }
        None
    }

    fn handle_message(&mut self, message: ServerMessage, position: &mut Position) -> SessionUpdate {
        match message {
            ServerMessage::StartGame => {
                info!("[SESSION] Game started");
                self.game_started = true;
                SessionUpdate::GameStarted
            }
            ServerMessage::NewMove(payload) => match self.apply_remote_move(&payload, position) {
                Ok(m) => {
                    debug!("[SESSION] Applied remote move {}", m);
                    SessionUpdate::RemoteMoveApplied(m)
                }
                Err(e) => {
                    warn!("[SESSION] Rejected remote move {:?}: {}", payload, e);
                    SessionUpdate::RemoteMoveRejected {
                        payload,
                        reason: e.to_string(),
                    }
                }
            },
            ServerMessage::OpponentDisconnected => {
                warn!("[SESSION] Opponent disconnected");
                self.opponent_disconnected = true;
                SessionUpdate::OpponentDisconnected
            }
            ServerMessage::Error { message } => {
                warn!("[SESSION] Server error: {}", message);
                SessionUpdate::ServerError(message)
            }
        }
    }

    fn apply_remote_move(&self, payload: &MovePayload, position: &mut Position) -> GameResult<ChessMove> {
        if let Some(reason) = position.terminal_reason() {
            return Err(GameError::GameOver {
                reason: reason.into(),
            });
        }
        if self.opponent_disconnected {
            return Err(GameError::GameOver {
                reason: OverReason::OpponentDisconnected,
            });
        }
        let m = ChessMove::try_from(payload)?;
        if position.turn() == self.local_color {
            return Err(GameError::OutOfTurn {
                turn: position.turn(),
            });
        }
        *position = position.apply_move(&m)?;
        Ok(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networking::transport::ChannelTransport;

    fn session() -> (SessionSynchronizer, crate::networking::transport::ChannelPeer) {
        let (transport, peer) = ChannelTransport::pair();
        let mut session = SessionSynchronizer::new(Some(RoomCode::generate()), PlayerColor::White);
        session.open(Box::new(transport));
        (session, peer)
    }

    #[test]
    fn test_connect_sends_join() {
        let (mut session, mut peer) = session();
        let mut position = Position::new();
        let updates = session.handle_event(TransportEvent::Connected, &mut position);

        assert_eq!(
            updates,
            vec![SessionUpdate::ConnectionChanged(ConnectionState::Connected)]
        );
        let code = session.room().unwrap().as_str().to_string();
        assert_eq!(peer.try_next_sent(), Some(ClientMessage::JoinGame { code }));
    }

    #[test]
    fn test_connect_without_room_errors() {
        let (transport, mut peer) = ChannelTransport::pair();
        let mut session = SessionSynchronizer::new(None, PlayerColor::Black);
        session.open(Box::new(transport));

        let updates = session.handle_event(TransportEvent::Connected, &mut Position::new());
        assert!(updates.contains(&SessionUpdate::NoRoom));
        assert!(session.is_errored());
        assert_eq!(peer.try_next_sent(), None);
    }

    #[test]
    fn test_lifecycle_events_leave_position_alone() {
        let (mut session, _peer) = session();
        let mut position = Position::new();
        let before = position.fen();

        for event in [
            TransportEvent::Connected,
            TransportEvent::ConnectError {
                message: "reset".into(),
            },
            TransportEvent::ReconnectAttempt(1),
            TransportEvent::ReconnectFailed,
        ] {
            session.handle_event(event, &mut position);
        }
        assert_eq!(session.connection(), ConnectionState::Failed);
        assert_eq!(position.fen(), before);
    }

    #[test]
    fn test_remote_move_on_local_turn_is_rejected() {
        let (mut session, _peer) = session();
        let mut position = Position::new();
        let updates = session.handle_event(
            TransportEvent::Message(ServerMessage::NewMove(MovePayload::new("e2", "e4", None))),
            &mut position,
        );
        assert!(matches!(
            updates.as_slice(),
            [SessionUpdate::RemoteMoveRejected { .. }]
        ));
        assert_eq!(position, Position::new());
    }

    #[test]
    fn test_reconnect_clears_game_started() {
        let (mut session, _peer) = session();
        let mut position = Position::new();
        session.handle_event(TransportEvent::Connected, &mut position);
        session.handle_event(TransportEvent::Message(ServerMessage::StartGame), &mut position);
        assert!(session.game_started());

        session.handle_event(TransportEvent::ReconnectAttempt(1), &mut position);
        assert!(session.game_started());
        session.handle_event(TransportEvent::Connected, &mut position);
        assert!(!session.game_started());
    }

    #[test]
    fn test_remote_move_rejected_once_opponent_left() {
        let (transport, _peer) = ChannelTransport::pair();
        let mut session = SessionSynchronizer::new(Some(RoomCode::generate()), PlayerColor::Black);
        session.open(Box::new(transport));
        let mut position = Position::new();
        session.handle_event(
            TransportEvent::Message(ServerMessage::OpponentDisconnected),
            &mut position,
        );

        let payload = MovePayload::new("e2", "e4", None);
        let result = session.apply_remote_move(&payload, &mut position);
        assert!(matches!(
            result,
            Err(GameError::GameOver {
                reason: OverReason::OpponentDisconnected
            })
        ));
        assert_eq!(position, Position::new());
    }
}
