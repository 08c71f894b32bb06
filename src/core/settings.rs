//! Settings persistence
//!
//! Saves and loads [`GameSettings`] to/from a JSON file.
//!
//! # File Location
//!
//! `settings.json` in the user's configuration directory, e.g.
//! `~/.config/chessduel/settings.json`. Falls back to `settings.json` in the
//! working directory if the platform config dir cannot be found.
//!
//! # Error Handling
//!
//! - [`load_settings`] never fails: a missing or invalid file yields defaults
//! - [`save_settings`] reports the error and leaves the old file in place

use crate::core::error::CoreResult;
use crate::game::types::PlayerColor;
use crate::networking::ReconnectPolicy;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use stockfish_bridge::EngineConfig;
use tracing::{info, warn};

/// Settings filename
const SETTINGS_FILENAME: &str = "settings.json";

pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:3000/ws";

/// User preferences persisted between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// Analysis engine process and UCI options
    pub engine: EngineConfig,

    /// Relay server for multiplayer games
    pub server_url: String,

    /// Engine strength 0..=20
    pub difficulty: u8,

    /// Side played against the engine
    pub player_color: PlayerColor,

    /// Run background evaluation after every move
    pub show_evaluation: bool,

    pub reconnect: ReconnectPolicy,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            server_url: DEFAULT_SERVER_URL.to_string(),
            difficulty: 20,
            player_color: PlayerColor::White,
            show_evaluation: true,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Path to `settings.json` in the user's configuration directory
pub fn settings_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "trilltino", "chessduel") {
        proj_dirs.config_dir().join(SETTINGS_FILENAME)
    } else {
        PathBuf::from(SETTINGS_FILENAME)
    }
}

/// Load settings from the default location, falling back to defaults
pub fn load_settings() -> GameSettings {
    load_settings_from(&settings_path())
}

/// Load settings from `path`, falling back to defaults
pub fn load_settings_from(path: &Path) -> GameSettings {
    if !path.exists() {
        info!("[SETTINGS] No settings file found at {:?}. Using defaults.", path);
        return GameSettings::default();
    }

    match read_settings(path) {
        Ok(settings) => {
            info!("[SETTINGS] Loaded settings from {:?}", path);
            settings
        }
        Err(e) => {
            warn!(
                "[SETTINGS] Failed to load settings file at {:?}: {}. Using defaults.",
                path, e
            );
            GameSettings::default()
        }
    }
}

fn read_settings(path: &Path) -> CoreResult<GameSettings> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Save settings to the default location
pub fn save_settings(settings: &GameSettings) -> CoreResult<()> {
    save_settings_to(settings, &settings_path())
}

/// Save settings to `path`, creating its directory if needed
pub fn save_settings_to(settings: &GameSettings, path: &Path) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    info!("[SETTINGS] Saved settings to {:?}", path);
    Ok(())
}
