//! Chess game logic module - rules, status and the session controller
//!
//! Pure game logic lives apart from I/O. Everything except the controller is
//! synchronous and can be exercised without a runtime.
//!
//! # Module Organization
//!
//! - `types` - [`PlayerColor`] and [`ChessMove`] (UCI notation)
//! - `rules` - immutable [`Position`] snapshots with legality, check and
//!   terminal detection
//! - `status` - [`GameStatus`], derived from position and session facts
//! - `mode` - [`GameMode`] and the [`Difficulty`] presets
//! - `controller` - [`GameController`], the single owner of the current
//!   position in a running game
//! - `error` - [`GameError`] for rejected move intents

pub mod controller;
pub mod error;
pub mod mode;
pub mod rules;
pub mod status;
pub mod types;

// Re-export commonly used items
pub use controller::{Evaluation, GameController, GameSnapshot, MoveOutcome};
pub use error::{GameError, GameResult};
pub use mode::{Difficulty, GameMode};
pub use rules::{Position, RulesStatus, TerminalReason, STARTING_FEN};
pub use status::{derive_status, GameStatus, OverReason, StatusInputs};
pub use types::{ChessMove, PlayerColor};
