//! Game mode and engine strength
//!
//! # Difficulty Levels
//!
//! Strength is a single level in `0..=20`, sent to the engine as its
//! `Skill Level`. The same level scales how long the engine thinks per move
//! and how deep background evaluations go:
//!
//! | Preset     | Level | Think time | Eval depth |
//! |------------|-------|------------|------------|
//! | Easy       | 2     | 1.4s       | 17         |
//! | Medium     | 6     | 2.2s       | 21         |
//! | MediumRare | 10    | 3.0s       | 25         |
//! | Hard       | 15    | 4.0s       | 30         |
//! | VeryHard   | 20    | 5.0s       | 30         |

use shared::RoomCode;
use std::time::Duration;

const BASE_THINK_MS: u64 = 1000;
const THINK_MS_PER_LEVEL: u64 = 200;
const MAX_THINK_MS: u64 = 10_000;
const BASE_EVAL_DEPTH: u32 = 15;
const MAX_EVAL_DEPTH: u32 = 30;

/// Named strength presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Difficulty {
    Easy,
    Medium,
    MediumRare,
    Hard,
    VeryHard,
}

impl Difficulty {
    pub fn level(self) -> u8 {
        match self {
            Difficulty::Easy => 2,
            Difficulty::Medium => 6,
            Difficulty::MediumRare => 10,
            Difficulty::Hard => 15,
            Difficulty::VeryHard => 20,
        }
    }
}

/// Clamp an arbitrary requested level into the engine's range
pub fn clamp_level(level: i32) -> u8 {
    stockfish_bridge::clamp_skill(level)
}

/// Time budget for one engine move at `level`
pub fn think_time(level: u8) -> Duration {
    let ms = BASE_THINK_MS + u64::from(level) * THINK_MS_PER_LEVEL;
    Duration::from_millis(ms.min(MAX_THINK_MS))
}

/// Search depth for background evaluation at `level`
pub fn evaluation_depth(level: u8) -> u32 {
    (BASE_EVAL_DEPTH + u32::from(level)).min(MAX_EVAL_DEPTH)
}

/// Who the local player is facing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameMode {
    /// Against the analysis engine
    SinglePlayer { level: u8 },
    /// Against a remote peer in `room`
    Multiplayer { room: RoomCode },
}

impl GameMode {
    pub fn is_multiplayer(&self) -> bool {
        matches!(self, GameMode::Multiplayer { .. })
    }
}
