//! Chess rules adapter - Pure game logic over the `shakmaty` rules engine
//!
//! Everything chess-specific (legal move generation, check and mate
//! detection, draw rules, FEN) is delegated to `shakmaty`. This module only
//! shapes it into the snapshot model the rest of the application uses.
//!
//! # Architecture
//!
//! - **Immutable snapshots**: [`Position::apply_move`] never mutates its
//!   receiver; an accepted move yields a fresh [`Position`]
//! - **Rejections are values**: an illegal move is `Err(GameError::IllegalMove)`,
//!   never a panic
//! - **Repetition tracking**: each snapshot carries the keys of every position
//!   reached so far, so threefold repetition can be classified without a
//!   separate history object
//!
//! # Module Structure
//!
//! - `position` - [`Position`] snapshot, [`RulesStatus`] and [`TerminalReason`]

pub mod position;


// Re-export commonly used items
pub use position::{Position, RulesStatus, TerminalReason, STARTING_FEN};
