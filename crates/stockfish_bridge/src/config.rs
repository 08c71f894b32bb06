use crate::uci::UciCommand;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Highest skill level accepted by the engine's `Skill Level` option
pub const MAX_SKILL_LEVEL: i32 = 20;

/// Settings for the analysis process and the adapter's timing heuristics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine executable, resolved through `PATH` when relative
    pub path: PathBuf,
    pub threads: u32,
    pub hash_mb: u32,
    pub skill_level: u8,
    pub analyse_mode: bool,
    /// Drain interval after `stop`; UCI has no acknowledgement for it
    pub stop_grace_ms: u64,
    /// Added on top of a best-move time budget before giving up
    pub best_move_grace_ms: u64,
    pub ready_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("stockfish"),
            threads: 4,
            hash_mb: 32,
            skill_level: MAX_SKILL_LEVEL as u8,
            analyse_mode: false,
            stop_grace_ms: 50,
            best_move_grace_ms: 2000,
            ready_timeout_ms: 5000,
        }
    }
}

impl EngineConfig {
    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn best_move_grace(&self) -> Duration {
        Duration::from_millis(self.best_move_grace_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    /// Commands sent right after the process starts, in order.
    ///
    /// `isready` goes out before the options; the engine queues the
    /// `setoption` lines and applies them before the first search.
    pub fn handshake(&self) -> Vec<UciCommand> {
        vec![
            UciCommand::Uci,
            UciCommand::IsReady,
            UciCommand::set_option("Threads", self.threads),
            UciCommand::set_option("Hash", self.hash_mb),
            UciCommand::set_option("Skill Level", clamp_skill(i32::from(self.skill_level))),
            UciCommand::set_option("UCI_AnalyseMode", self.analyse_mode),
        ]
    }
}

/// Clamp a requested difficulty into the engine's skill range
pub fn clamp_skill(level: i32) -> u8 {
    level.clamp(0, MAX_SKILL_LEVEL) as u8
}
