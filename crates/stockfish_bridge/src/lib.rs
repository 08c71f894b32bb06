//! Async adapter for a long-running UCI analysis engine (Stockfish)
//!
//! # Architecture
//!
//! ```text
//! AnalysisEngine ──commands──> EngineLink ──stdin──> stockfish
//!       ▲                          │
//!       └──── pump task <──lines───┘ <──stdout──
//! ```
//!
//! - [`uci`]: renders commands and classifies output lines
//! - [`link`]: a pair of line channels, backed by a child process or by an
//!   in-memory [`link::ScriptedEnd`] for tests
//! - [`engine`]: the request/response façade with request tokens, stop
//!   handling and the best-move timeout
//!
//! The adapter never fails a game: an engine that cannot be spawned yields a
//! disabled [`AnalysisEngine`] whose best-move requests resolve to `None`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use stockfish_bridge::{AnalysisEngine, EngineConfig};
//!
//! let engine = AnalysisEngine::open(EngineConfig::default());
//! let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
//! if let Some(uci) = engine.get_best_move(fen, Duration::from_millis(1200)).await {
//!     println!("engine plays {uci}");
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod link;
pub mod uci;

pub use config::{clamp_skill, EngineConfig, MAX_SKILL_LEVEL};
pub use engine::{AnalysisEngine, AnalysisResult, AnalysisUpdate, EngineState, RequestToken};
pub use error::{EngineError, EngineResult};
pub use link::{EngineLink, ScriptedEnd};
pub use uci::{EngineLine, InfoLine, Score, UciCommand};
