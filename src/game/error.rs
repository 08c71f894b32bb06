//! Error types for game module
//!
//! Rejections of a move intent (`IllegalMove`, `OutOfTurn`, `GameOver`,
//! `AwaitingPeer`) are ordinary negative results: the caller shows a notice
//! and nothing about the game has changed.

use crate::game::status::OverReason;
use crate::game::types::PlayerColor;
use crate::networking::TransportError;
use shared::RoomCodeError;

/// Errors that can occur in game logic
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The move is not legal in the current position
    #[error("Illegal move: {uci}")]
    IllegalMove { uci: String },

    /// The move was submitted while it is the other side's turn
    #[error("Not your turn: {turn} to move")]
    OutOfTurn { turn: PlayerColor },

    /// The game has already ended
    #[error("Game is over: {reason}")]
    GameOver { reason: OverReason },

    /// Multiplayer game has not started yet, or the link is down
    #[error("Waiting for the opponent")]
    AwaitingPeer,

    /// Move text or payload could not be parsed
    #[error("Malformed move: {message}")]
    MalformedMove { message: String },

    /// A position string could not be loaded
    #[error("Invalid position: {message}")]
    InvalidPosition { message: String },

    /// Room code failed validation
    #[error(transparent)]
    InvalidRoom(#[from] RoomCodeError),

    /// The realtime channel could not carry the message
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Result type alias for game operations
pub type GameResult<T> = Result<T, GameError>;
