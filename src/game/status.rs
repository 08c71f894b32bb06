//! Game status reducer
//!
//! [`GameStatus`] is never stored. It is recomputed from the current position
//! and session facts after every mutation, so the two cannot drift apart.
//!
//! Precedence, first match wins:
//!
//! 1. the position is terminal → `Over(reason)`
//! 2. the opponent left → `Over(OpponentDisconnected)`
//! 3. multiplayer without a started game or a live link → `AwaitingPeer`
//! 4. side to move is in check → `Check`
//! 5. local side to move → `LocalTurn`
//! 6. otherwise `InProgress` against the engine, `RemoteTurn` against a peer

use crate::game::rules::{Position, TerminalReason};
use crate::game::types::PlayerColor;
use crate::networking::ConnectionState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverReason {
    Checkmate,
    Stalemate,
    ThreefoldRepetition,
    InsufficientMaterial,
    FiftyMove,
    OpponentDisconnected,
}

impl From<TerminalReason> for OverReason {
    fn from(reason: TerminalReason) -> Self {
        match reason {
            TerminalReason::Checkmate => OverReason::Checkmate,
            TerminalReason::Stalemate => OverReason::Stalemate,
            TerminalReason::ThreefoldRepetition => OverReason::ThreefoldRepetition,
            TerminalReason::InsufficientMaterial => OverReason::InsufficientMaterial,
            TerminalReason::FiftyMove => OverReason::FiftyMove,
        }
    }
}

impl OverReason {
    /// The rules-level reason, `None` for a disconnect
    pub fn terminal(self) -> Option<TerminalReason> {
        match self {
            OverReason::Checkmate => Some(TerminalReason::Checkmate),
            OverReason::Stalemate => Some(TerminalReason::Stalemate),
            OverReason::ThreefoldRepetition => Some(TerminalReason::ThreefoldRepetition),
            OverReason::InsufficientMaterial => Some(TerminalReason::InsufficientMaterial),
            OverReason::FiftyMove => Some(TerminalReason::FiftyMove),
            OverReason::OpponentDisconnected => None,
        }
    }
}

impl fmt::Display for OverReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.terminal() {
            Some(reason) => write!(f, "{}", reason),
            None => f.write_str("opponent disconnected"),
        }
    }
}

/// What the player should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStatus {
    AwaitingPeer,
    InProgress,
    LocalTurn,
    RemoteTurn,
    Check,
    Over(OverReason),
}

impl GameStatus {
    pub fn is_over(&self) -> bool {
        matches!(self, GameStatus::Over(_))
    }
}

/// Everything the status depends on
#[derive(Debug, Clone, Copy)]
pub struct StatusInputs<'a> {
    pub position: &'a Position,
    pub connection: ConnectionState,
    pub local_color: PlayerColor,
    pub multiplayer: bool,
    /// The remote start signal has been received
    pub peer_present: bool,
    pub opponent_disconnected: bool,
}

pub fn derive_status(inputs: &StatusInputs<'_>) -> GameStatus {
    if let Some(reason) = inputs.position.terminal_reason() {
        return GameStatus::Over(reason.into());
    }
    if inputs.opponent_disconnected {
        return GameStatus::Over(OverReason::OpponentDisconnected);
    }
    if inputs.multiplayer
        && (!inputs.peer_present || inputs.connection != ConnectionState::Connected)
    {
        return GameStatus::AwaitingPeer;
    }
    if inputs.position.is_check() {
        return GameStatus::Check;
    }

    let local_to_move = inputs.position.turn() == inputs.local_color;
    match (local_to_move, inputs.multiplayer) {
        (true, _) => GameStatus::LocalTurn,
        (false, false) => GameStatus::InProgress,
        (false, true) => GameStatus::RemoteTurn,
    }
}
