//! Room bookkeeping for the relay
//!
//! A room is created by the first `join-game` for its code and holds at most
//! two connections. The relay never looks at chess rules: moves are passed
//! through to the other occupant verbatim.
//!
//! When a player drops out of a started game the seat is held. A `join-game`
//! for the same code fills it again and both sides get a fresh `start-game`,
//! followed by any moves that arrived for the empty seat. If nobody comes
//! back before [`GameRooms::expire`] runs for that vacancy, the remaining
//! player is sent `opponent-disconnected` and the room is freed.

use shared::{MovePayload, RoomCode, ServerMessage};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Identifies one WebSocket connection for its lifetime
pub type ConnectionId = u64;

/// Frames queued for one connection's writer task
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

/// What happened to a `join-game` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// First occupant; waiting for an opponent
    Waiting,
    /// Second occupant; both sides were sent `start-game`
    Started,
    /// Took a seat held since a drop; both sides were sent `start-game`
    Resumed,
    /// Two occupants already; the joiner was sent an error
    Full,
    /// The connection already sits in a room
    AlreadySeated,
}

/// A seat left empty in a started game, to be expired if nobody returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vacancy {
    pub code: RoomCode,
    generation: u64,
}

#[derive(Debug)]
struct Seat {
    id: ConnectionId,
    outbox: Outbox,
}

impl Seat {
    fn send(&self, message: ServerMessage) {
        if self.outbox.send(message).is_err() {
            debug!("[RELAY] Connection {} writer already gone", self.id);
        }
    }
}

#[derive(Debug)]
struct GameRoom {
    host: Option<Seat>,
    guest: Option<Seat>,
    started: bool,
    /// Bumped on every drop so a stale expiry cannot close a later vacancy
    vacancy: u64,
    /// Moves sent while the other seat was empty
    held_moves: Vec<MovePayload>,
}

impl GameRoom {
    fn new(host: Seat) -> Self {
        Self {
            host: Some(host),
            guest: None,
            started: false,
            vacancy: 0,
            held_moves: Vec::new(),
        }
    }

    fn seats(&self) -> impl Iterator<Item = &Seat> {
        self.host.iter().chain(self.guest.iter())
    }

    fn other(&self, id: ConnectionId) -> Option<&Seat> {
        self.seats().find(|seat| seat.id != id)
    }

    fn is_full(&self) -> bool {
        self.host.is_some() && self.guest.is_some()
    }

    fn vacate(&mut self, id: ConnectionId) {
        if self.host.as_ref().is_some_and(|seat| seat.id == id) {
            self.host = None;
        } else if self.guest.as_ref().is_some_and(|seat| seat.id == id) {
            self.guest = None;
        }
    }
}

/// All active rooms
#[derive(Debug, Default)]
pub struct GameRooms {
    rooms: HashMap<RoomCode, GameRoom>,
    connection_to_room: HashMap<ConnectionId, RoomCode>,
}

impl GameRooms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&mut self, id: ConnectionId, outbox: Outbox, code: RoomCode) -> JoinOutcome {
        if let Some(current) = self.connection_to_room.get(&id) {
            warn!("[RELAY] Connection {} already in room {}", id, current);
            let _ = outbox.send(ServerMessage::Error {
                message: "Already in a room".to_string(),
            });
            return JoinOutcome::AlreadySeated;
        }

        let seat = Seat { id, outbox };
        let outcome = match self.rooms.get_mut(&code) {
            None => {
                info!("[RELAY] Connection {} created room {}", id, code);
                self.rooms.insert(code.clone(), GameRoom::new(seat));
                JoinOutcome::Waiting
            }
            Some(room) if room.is_full() => {
                warn!("[RELAY] Connection {} turned away from full room {}", id, code);
                seat.send(ServerMessage::Error {
                    message: "Room is full".to_string(),
                });
                return JoinOutcome::Full;
            }
            Some(room) if !room.started => {
                info!("[RELAY] Connection {} joined room {}, starting game", id, code);
                room.started = true;
                for present in room.seats() {
                    present.send(ServerMessage::StartGame);
                }
                seat.send(ServerMessage::StartGame);
                room.guest = Some(seat);
                JoinOutcome::Started
            }
            Some(room) => {
                info!("[RELAY] Connection {} took the held seat in room {}", id, code);
                for present in room.seats() {
                    present.send(ServerMessage::StartGame);
                }
                seat.send(ServerMessage::StartGame);
                for payload in room.held_moves.drain(..) {
                    seat.send(ServerMessage::NewMove(payload));
                }
                if room.host.is_none() {
                    room.host = Some(seat);
                } else {
                    room.guest = Some(seat);
                }
                JoinOutcome::Resumed
            }
        };
        self.connection_to_room.insert(id, code);
        outcome
    }

    /// Pass a move to the other occupant, or hold it while their seat is
    /// empty. Returns whether the move was delivered or held.
    pub fn relay_move(&mut self, id: ConnectionId, payload: MovePayload) -> bool {
        let Some(room) = self
            .connection_to_room
            .get(&id)
            .and_then(|code| self.rooms.get_mut(code))
        else {
            debug!("[RELAY] Move from connection {} has no room", id);
            return false;
        };
        if let Some(other) = room.other(id) {
            other.send(ServerMessage::NewMove(payload));
            return true;
        }
        if room.started {
            debug!("[RELAY] Holding move from connection {} for the empty seat", id);
            room.held_moves.push(payload);
            return true;
        }
        debug!("[RELAY] Move from connection {} has no recipient", id);
        false
    }

    /// Forget a closed connection.
    ///
    /// A room that never started, or that is now empty, is freed at once.
    /// Otherwise the seat is held and the returned [`Vacancy`] should be
    /// passed to [`GameRooms::expire`] once the rejoin grace has passed.
    pub fn leave(&mut self, id: ConnectionId) -> Option<Vacancy> {
        let code = self.connection_to_room.remove(&id)?;
        let room = self.rooms.get_mut(&code)?;
        room.vacate(id);

        if !room.started || room.seats().next().is_none() {
            self.rooms.remove(&code);
            info!("[RELAY] Room {} closed", code);
            return None;
        }
        room.vacancy += 1;
        info!("[RELAY] Connection {} dropped from room {}, holding the seat", id, code);
        Some(Vacancy {
            generation: room.vacancy,
            code,
        })
    }

    /// Give up on a held seat. The remaining occupant is told and the room is
    /// freed. Returns false when the seat was taken again in the meantime.
    pub fn expire(&mut self, vacancy: &Vacancy) -> bool {
        let still_vacant = self
            .rooms
            .get(&vacancy.code)
            .is_some_and(|room| room.vacancy == vacancy.generation && !room.is_full());
        if !still_vacant {
            return false;
        }
        let Some(room) = self.rooms.remove(&vacancy.code) else {
            return false;
        };
        for seat in room.seats() {
            info!("[RELAY] Room {} expired, notifying connection {}", vacancy.code, seat.id);
            seat.send(ServerMessage::OpponentDisconnected);
            self.connection_to_room.remove(&seat.id);
        }
        true
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn occupants(&self, code: &RoomCode) -> usize {
        self.rooms.get(code).map_or(0, |room| room.seats().count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> (Outbox, mpsc::UnboundedReceiver<ServerMessage>) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn test_second_join_starts_game() {
        let mut rooms = GameRooms::new();
        let code = RoomCode::generate();
        let (host_tx, mut host_rx) = client();
        let (guest_tx, mut guest_rx) = client();

        assert_eq!(rooms.join(1, host_tx, code.clone()), JoinOutcome::Waiting);
        assert!(host_rx.try_recv().is_err());

        assert_eq!(rooms.join(2, guest_tx, code.clone()), JoinOutcome::Started);
        assert_eq!(host_rx.try_recv().unwrap(), ServerMessage::StartGame);
        assert_eq!(guest_rx.try_recv().unwrap(), ServerMessage::StartGame);
        assert_eq!(rooms.occupants(&code), 2);
    }

    #[test]
    fn test_third_join_is_rejected() {
        let mut rooms = GameRooms::new();
        let code = RoomCode::generate();
        let (tx1, _rx1) = client();
        let (tx2, _rx2) = client();
        let (tx3, mut rx3) = client();

        rooms.join(1, tx1, code.clone());
        rooms.join(2, tx2, code.clone());
        assert_eq!(rooms.join(3, tx3, code.clone()), JoinOutcome::Full);
        assert_eq!(
            rx3.try_recv().unwrap(),
            ServerMessage::Error {
                message: "Room is full".to_string()
            }
        );
        assert_eq!(rooms.occupants(&code), 2);
    }

    #[test]
    fn test_moves_go_to_the_other_side_verbatim() {
        //! The relay does not check legality
        let mut rooms = GameRooms::new();
        let code = RoomCode::generate();
        let (host_tx, mut host_rx) = client();
        let (guest_tx, mut guest_rx) = client();
        rooms.join(1, host_tx, code.clone());
        rooms.join(2, guest_tx, code);
        host_rx.try_recv().unwrap();
        guest_rx.try_recv().unwrap();

        let nonsense = MovePayload::new("a1", "h8", None);
        assert!(rooms.relay_move(1, nonsense.clone()));
        assert_eq!(guest_rx.try_recv().unwrap(), ServerMessage::NewMove(nonsense));
        assert!(host_rx.try_recv().is_err());

        let reply = MovePayload::new("e7", "e5", None);
        assert!(rooms.relay_move(2, reply.clone()));
        assert_eq!(host_rx.try_recv().unwrap(), ServerMessage::NewMove(reply));
    }

    #[test]
    fn test_move_without_opponent_is_dropped() {
        let mut rooms = GameRooms::new();
        let (tx, _rx) = client();
        rooms.join(1, tx, RoomCode::generate());

        assert!(!rooms.relay_move(1, MovePayload::new("e2", "e4", None)));
        assert!(!rooms.relay_move(99, MovePayload::new("e2", "e4", None)));
    }

    fn started_room(
        rooms: &mut GameRooms,
    ) -> (
        RoomCode,
        mpsc::UnboundedReceiver<ServerMessage>,
        mpsc::UnboundedReceiver<ServerMessage>,
    ) {
        let code = RoomCode::generate();
        let (host_tx, mut host_rx) = client();
        let (guest_tx, mut guest_rx) = client();
        rooms.join(1, host_tx, code.clone());
        rooms.join(2, guest_tx, code.clone());
        assert_eq!(host_rx.try_recv().unwrap(), ServerMessage::StartGame);
        assert_eq!(guest_rx.try_recv().unwrap(), ServerMessage::StartGame);
        (code, host_rx, guest_rx)
    }

    #[test]
    fn test_expired_seat_notifies_opponent_and_frees_room() {
        let mut rooms = GameRooms::new();
        let (code, mut host_rx, _guest_rx) = started_room(&mut rooms);

        let vacancy = rooms.leave(2).expect("seat is held");
        assert!(host_rx.try_recv().is_err());
        assert_eq!(rooms.occupants(&code), 1);

        assert!(rooms.expire(&vacancy));
        assert_eq!(host_rx.try_recv().unwrap(), ServerMessage::OpponentDisconnected);
        assert_eq!(rooms.room_count(), 0);
        assert!(!rooms.relay_move(1, MovePayload::new("e2", "e4", None)));

        // The code can be reused afterwards
        let (tx, _rx) = client();
        assert_eq!(rooms.join(3, tx, code), JoinOutcome::Waiting);
    }

    #[test]
    fn test_rejoin_takes_the_held_seat() {
        //! A dropped player who comes back resumes the same game
        let mut rooms = GameRooms::new();
        let (code, mut host_rx, _guest_rx) = started_room(&mut rooms);
        let vacancy = rooms.leave(2).unwrap();

        let held = MovePayload::new("e2", "e4", None);
        assert!(rooms.relay_move(1, held.clone()));

        let (tx, mut rx) = client();
        assert_eq!(rooms.join(3, tx, code.clone()), JoinOutcome::Resumed);
        assert_eq!(rx.try_recv().unwrap(), ServerMessage::StartGame);
        assert_eq!(rx.try_recv().unwrap(), ServerMessage::NewMove(held));
        assert_eq!(host_rx.try_recv().unwrap(), ServerMessage::StartGame);
        assert_eq!(rooms.occupants(&code), 2);

        // The old timer no longer applies
        assert!(!rooms.expire(&vacancy));
        assert!(host_rx.try_recv().is_err());

        let reply = MovePayload::new("c7", "c5", None);
        assert!(rooms.relay_move(3, reply.clone()));
        assert_eq!(host_rx.try_recv().unwrap(), ServerMessage::NewMove(reply));
    }

    #[test]
    fn test_stale_expiry_does_not_close_a_later_vacancy() {
        let mut rooms = GameRooms::new();
        let (code, _host_rx, _guest_rx) = started_room(&mut rooms);
        let first = rooms.leave(2).unwrap();
        let (tx, _rx) = client();
        rooms.join(3, tx, code.clone());
        let second = rooms.leave(3).unwrap();

        assert!(!rooms.expire(&first));
        assert_eq!(rooms.occupants(&code), 1);
        assert!(rooms.expire(&second));
    }

    #[test]
    fn test_both_players_gone_frees_room() {
        let mut rooms = GameRooms::new();
        let (_code, _host_rx, _guest_rx) = started_room(&mut rooms);
        let vacancy = rooms.leave(1).unwrap();
        assert_eq!(rooms.leave(2), None);
        assert_eq!(rooms.room_count(), 0);
        assert!(!rooms.expire(&vacancy));
    }

    #[test]
    fn test_host_alone_leaving_closes_room() {
        let mut rooms = GameRooms::new();
        let (tx, _rx) = client();
        rooms.join(1, tx, RoomCode::generate());
        assert_eq!(rooms.leave(1), None);
        assert_eq!(rooms.room_count(), 0);
        assert_eq!(rooms.leave(1), None);
    }

    #[test]
    fn test_double_join_is_refused() {
        let mut rooms = GameRooms::new();
        let (tx, mut rx) = client();
        rooms.join(1, tx.clone(), RoomCode::generate());
        assert_eq!(
            rooms.join(1, tx, RoomCode::generate()),
            JoinOutcome::AlreadySeated
        );
        assert!(matches!(rx.try_recv(), Ok(ServerMessage::Error { .. })));
        assert_eq!(rooms.room_count(), 1);
    }
}
