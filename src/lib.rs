//! chessduel - two-sided chess against an analysis engine or a remote peer
//!
//! # Module Structure
//!
//! - `game` - rules, status derivation and the [`GameController`]
//! - `networking` - realtime transport and the session synchronizer
//! - `core` - settings persistence and logging setup
//!
//! The analysis engine adapter lives in the `stockfish_bridge` crate and the
//! wire protocol in `shared`.

pub mod core;
pub mod game;
pub mod networking;

pub use game::GameController;
