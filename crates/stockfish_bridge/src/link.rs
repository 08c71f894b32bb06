//! Line-oriented link to an engine
//!
//! An [`EngineLink`] is a pair of unbounded channels: commands flow in, raw
//! output lines flow out. [`EngineLink::spawn`] backs the channels with a
//! child process and two pipe tasks; [`EngineLink::in_memory`] hands the far
//! end to the caller so a scripted engine can sit behind the same interface.

use crate::error::{EngineError, EngineResult};
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Channels to a running engine
pub struct EngineLink {
    pub(crate) commands: mpsc::UnboundedSender<String>,
    pub(crate) lines: mpsc::UnboundedReceiver<String>,
    pub(crate) child: Option<Child>,
}

/// The engine side of an in-memory link
pub struct ScriptedEnd {
    /// Commands written by the adapter, one per element, without newline
    pub commands: mpsc::UnboundedReceiver<String>,
    /// Lines pushed here are read by the adapter as engine output
    pub lines: mpsc::UnboundedSender<String>,
}

impl EngineLink {
    /// Start the engine executable and wire its stdin/stdout.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(path: &Path) -> EngineResult<Self> {
        let mut child = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                path: path.display().to_string(),
                source,
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| EngineError::Io {
            message: "engine stdin was not captured".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| EngineError::Io {
            message: "engine stdout was not captured".to_string(),
        })?;

        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<String>();
        let (line_tx, line_rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            while let Some(cmd) = cmd_rx.recv().await {
                let framed = format!("{}\n", cmd);
                if let Err(e) = stdin.write_all(framed.as_bytes()).await {
                    warn!("[ENGINE] Failed to write '{}': {}", cmd, e);
                    break;
                }
                if let Err(e) = stdin.flush().await {
                    warn!("[ENGINE] Failed to flush stdin: {}", e);
                    break;
                }
            }
            debug!("[ENGINE] Command pipe closed");
        });

        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout).lines();
            loop {
                match reader.next_line().await {
                    Ok(Some(line)) => {
                        if line_tx.send(line).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("[ENGINE] Failed to read engine output: {}", e);
                        break;
                    }
                }
            }
            debug!("[ENGINE] Output pipe closed");
        });

        info!("[ENGINE] Spawned {}", path.display());
        Ok(Self {
            commands: cmd_tx,
            lines: line_rx,
            child: Some(child),
        })
    }

    /// A link with no process behind it
    pub fn in_memory() -> (Self, ScriptedEnd) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (line_tx, line_rx) = mpsc::unbounded_channel();
        (
            Self {
                commands: cmd_tx,
                lines: line_rx,
                child: None,
            },
            ScriptedEnd {
                commands: cmd_rx,
                lines: line_tx,
            },
        )
    }
}

impl ScriptedEnd {
    /// Emit one line of engine output
    pub fn say(&self, line: impl Into<String>) -> bool {
        self.lines.send(line.into()).is_ok()
    }

    /// Wait for the next command from the adapter
    pub async fn next_command(&mut self) -> Option<String> {
        self.commands.recv().await
    }
}
