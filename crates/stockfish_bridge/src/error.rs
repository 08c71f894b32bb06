//! Error types for the analysis engine adapter
//!
//! None of these are fatal to a game session. Callers are expected to fall
//! back (for example to a random legal move) rather than propagate them.

/// Errors that can occur while driving the analysis engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine executable could not be started
    #[error("Failed to spawn engine '{path}': {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A pipe to or from the engine process was unavailable
    #[error("Engine I/O error: {message}")]
    Io { message: String },

    /// The engine did not answer `isready` in time
    #[error("Engine did not report ready within {timeout_ms}ms")]
    NotReady { timeout_ms: u64 },

    /// The engine process exited or was terminated
    #[error("Engine process terminated")]
    Terminated,

    /// The adapter has no process (construction failed or never opened)
    #[error("Analysis engine unavailable")]
    Unavailable,

    /// A newer request replaced this one before it was issued
    #[error("Request {token} superseded by a newer request")]
    Superseded { token: u64 },
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
