//! Core module - application infrastructure shared by every mode
//!
//! # Module Structure
//!
//! - `settings` - [`GameSettings`] and their JSON persistence in the
//!   platform config directory
//! - `logging` - `tracing` subscriber setup for the binary
//! - `error` - [`CoreError`]

pub mod error;
pub mod logging;
pub mod settings;

// Re-export commonly used items
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
pub use settings::{load_settings, save_settings, GameSettings};
