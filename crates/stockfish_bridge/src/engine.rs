//! Request/response façade over the engine's line protocol
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized → Initializing → Ready ⇄ Searching
//!                       ↓           ↓        ↓
//!                   Terminated (process exit or terminate())
//! ```
//!
//! # Correlation
//!
//! Every request takes a monotonically increasing [`RequestToken`] when it is
//! made. Issuing a new request makes it the latest; older requests are
//! superseded, not queued. Each `go` command the adapter sends is recorded in
//! a FIFO, and UCI answers every `go` with exactly one `bestmove`, so the
//! front of the FIFO always names the search an incoming line belongs to.
//! Lines whose search is not the latest request are dropped before they
//! reach a subscriber or a waiting caller.

use crate::config::{clamp_skill, EngineConfig};
use crate::error::{EngineError, EngineResult};
use crate::link::EngineLink;
use crate::uci::{EngineLine, Score, UciCommand};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Identity of one analysis request
pub type RequestToken = u64;

/// Capacity of the analysis update stream before slow subscribers lag
const UPDATE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    /// Handshake sent, waiting for `readyok`
    Initializing,
    Ready,
    Searching,
    Terminated,
}

/// A parsed result, attributed to the request that produced it
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisResult {
    Evaluation {
        depth: u32,
        score: Score,
        pv: Vec<String>,
    },
    BestMove {
        /// Depth of the last complete `info` line of the same search
        depth: Option<u32>,
        best_move: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisUpdate {
    pub token: RequestToken,
    pub result: AnalysisResult,
}

#[derive(Default)]
struct Correlation {
    latest: RequestToken,
    /// Tokens of `go` commands still waiting for their `bestmove`
    in_flight: VecDeque<RequestToken>,
    last_depth: Option<u32>,
    pending_best: Option<(RequestToken, oneshot::Sender<Option<String>>)>,
}

struct Running {
    commands: mpsc::UnboundedSender<String>,
    pump: JoinHandle<()>,
    child: Option<Child>,
}

/// Handle to one long-running analysis process
pub struct AnalysisEngine {
    config: EngineConfig,
    running: Option<Running>,
    correlation: Arc<Mutex<Correlation>>,
    state: Arc<watch::Sender<EngineState>>,
    updates: broadcast::Sender<AnalysisUpdate>,
}

impl AnalysisEngine {
    /// Start the configured engine executable.
    ///
    /// A failed spawn is logged and yields a disabled adapter: best-move
    /// requests then resolve to `None` and evaluations are refused.
    pub fn open(config: EngineConfig) -> Self {
        match EngineLink::spawn(&config.path) {
            Ok(link) => Self::with_link(config, link),
            Err(e) => {
                error!("[ENGINE] {}. Continuing without analysis.", e);
                Self::disabled(config)
            }
        }
    }

    /// An adapter with no process behind it
    pub fn disabled(config: EngineConfig) -> Self {
        let (state, _) = watch::channel(EngineState::Uninitialized);
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Self {
            config,
            running: None,
            correlation: Arc::new(Mutex::new(Correlation::default())),
            state: Arc::new(state),
            updates,
        }
    }

    /// Drive an already-established link and send the handshake
    pub fn with_link(config: EngineConfig, link: EngineLink) -> Self {
        let mut engine = Self::disabled(config);
        engine.start(link);
        engine
    }

    fn start(&mut self, link: EngineLink) {
        let EngineLink {
            commands,
            lines,
            child,
        } = link;

        self.state.send_replace(EngineState::Initializing);
        let pump = tokio::spawn(pump_engine_output(
            lines,
            self.correlation.clone(),
            self.state.clone(),
            self.updates.clone(),
        ));
        self.running = Some(Running {
            commands,
            pump,
            child,
        });

        for command in self.config.handshake() {
            self.send(command);
        }
        debug!("[ENGINE] Handshake sent");
    }

    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    /// Whether a process is attached and still alive
    pub fn is_available(&self) -> bool {
        self.running.is_some() && self.state() != EngineState::Terminated
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stream of results for the latest request. Dropping the receiver
    /// unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisUpdate> {
        self.updates.subscribe()
    }

    /// Set the engine's `Skill Level` (clamped to 0..=20)
    pub fn set_difficulty(&self, level: i32) {
        let skill = clamp_skill(level);
        info!("[ENGINE] Skill level set to {}", skill);
        self.send(UciCommand::set_option("Skill Level", skill));
    }

    fn send(&self, command: UciCommand) {
        let Some(running) = &self.running else {
            return;
        };
        let line = command.to_string();
        trace!("[ENGINE] >> {}", line);
        if running.commands.send(line).is_err() {
            warn!("[ENGINE] Command pipe closed, dropped '{}'", command);
        }
    }

    /// Claim a new token and drop whatever best-move waiter it replaces
    fn reserve_token(&self) -> RequestToken {
        let mut correlation = self.correlation.lock();
        correlation.latest += 1;
        correlation.pending_best = None;
        correlation.latest
    }

    fn is_latest(&self, token: RequestToken) -> bool {
        self.correlation.lock().latest == token
    }

    /// Stop a running search and give the engine a moment to wind down
    async fn supersede(&self) {
        if self.state() == EngineState::Searching {
            debug!("[ENGINE] Stopping running search");
            self.send(UciCommand::Stop);
            tokio::time::sleep(self.config.stop_grace()).await;
        }
    }

    async fn wait_for_ready(&self) -> EngineResult<()> {
        let mut rx = self.state.subscribe();
        let wait = async {
            rx.wait_for(|s| {
                matches!(
                    s,
                    EngineState::Ready | EngineState::Searching | EngineState::Terminated
                )
            })
            .await
            .map(|state| *state)
        };
        match tokio::time::timeout(self.config.ready_timeout(), wait).await {
            Ok(Ok(EngineState::Terminated)) | Ok(Err(_)) => Err(EngineError::Terminated),
            Ok(Ok(_)) => Ok(()),
            Err(_) => Err(EngineError::NotReady {
                timeout_ms: self.config.ready_timeout_ms,
            }),
        }
    }

    /// Issue `position` + `go` for `token` unless a newer request arrived
    /// in the meantime. Returns whether the search was started.
    fn start_search(
        &self,
        token: RequestToken,
        fen: &str,
        go: UciCommand,
        waiter: Option<oneshot::Sender<Option<String>>>,
    ) -> bool {
        let mut correlation = self.correlation.lock();
        if correlation.latest != token {
            debug!("[ENGINE] Request {} superseded before it started", token);
            return false;
        }
        correlation.in_flight.push_back(token);
        correlation.last_depth = None;
        correlation.pending_best = waiter.map(|tx| (token, tx));

        self.state.send_replace(EngineState::Searching);
        self.send(UciCommand::Position {
            fen: fen.to_string(),
        });
        self.send(go);
        true
    }

    /// Start a depth-limited evaluation of `fen`.
    ///
    /// Results arrive on [`subscribe`](Self::subscribe) tagged with the
    /// returned token. A running search is stopped first.
    pub async fn evaluate_position(&self, fen: &str, depth: u32) -> EngineResult<RequestToken> {
        if self.running.is_none() {
            return Err(EngineError::Unavailable);
        }
        let token = self.reserve_token();
        self.supersede().await;
        self.wait_for_ready().await?;
        if !self.start_search(token, fen, UciCommand::GoDepth(depth), None) {
            return Err(EngineError::Superseded { token });
        }
        debug!("[ENGINE] Evaluating (token {}, depth {})", token, depth);
        Ok(token)
    }

    /// Ask for the best move in `fen` within `budget`.
    ///
    /// Resolves to `None` when the engine is unavailable, reports no move,
    /// is superseded by a newer request, or stays silent past
    /// `budget + best_move_grace`.
    pub async fn get_best_move(&self, fen: &str, budget: Duration) -> Option<String> {
        if self.running.is_none() {
            return None;
        }
        let token = self.reserve_token();
        let deadline = budget + self.config.best_move_grace();
        let movetime = budget.as_millis() as u64;
        let (tx, rx) = oneshot::channel();

        let request = async move {
            self.supersede().await;
            if let Err(e) = self.wait_for_ready().await {
                warn!("[ENGINE] {}", e);
                return None;
            }
            if !self.start_search(token, fen, UciCommand::GoMoveTime(movetime), Some(tx)) {
                return None;
            }
            rx.await.ok().flatten()
        };

        match tokio::time::timeout(deadline, request).await {
            Ok(best_move) => {
                debug!("[ENGINE] Best move for token {}: {:?}", token, best_move);
                best_move
            }
            Err(_) => {
                warn!(
                    "[ENGINE] No best move within {}ms (token {})",
                    deadline.as_millis(),
                    token
                );
                if self.is_latest(token) {
                    self.send(UciCommand::Stop);
                }
                None
            }
        }
    }

    /// Ask the engine to `quit`, kill the process if it is still running
    /// after the stop grace, and reset to `Uninitialized`.
    ///
    /// Outstanding requests are abandoned: their futures resolve to `None`
    /// or an error, they are not actively rejected.
    pub fn terminate(&mut self) {
        self.send(UciCommand::Quit);
        if let Some(running) = self.running.take() {
            running.pump.abort();
            if let Some(child) = running.child {
                reap_child(child, Duration::from_millis(self.config.stop_grace_ms));
            }
            info!("[ENGINE] Terminated");
        }
        *self.correlation.lock() = Correlation::default();
        self.state.send_replace(EngineState::Uninitialized);
    }
}

impl Drop for AnalysisEngine {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.pump.abort();
        }
    }
}

/// Give the process `grace` to exit after `quit`, then kill it
fn reap_child(mut child: Child, grace: Duration) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        if let Err(e) = child.start_kill() {
            warn!("[ENGINE] Failed to kill engine process: {}", e);
        }
        return;
    };
    runtime.spawn(async move {
        if tokio::time::timeout(grace, child.wait()).await.is_ok() {
            debug!("[ENGINE] Process exited after quit");
            return;
        }
        if let Err(e) = child.start_kill() {
            warn!("[ENGINE] Failed to kill engine process: {}", e);
        }
    });
}

/// Read engine output until the link closes, routing each line
async fn pump_engine_output(
    mut lines: mpsc::UnboundedReceiver<String>,
    correlation: Arc<Mutex<Correlation>>,
    state: Arc<watch::Sender<EngineState>>,
    updates: broadcast::Sender<AnalysisUpdate>,
) {
    while let Some(line) = lines.recv().await {
        trace!("[ENGINE] << {}", line);
        match EngineLine::parse(&line) {
            Some(EngineLine::ReadyOk) => {
                state.send_if_modified(|s| {
                    if *s == EngineState::Initializing {
                        *s = EngineState::Ready;
                        true
                    } else {
                        false
                    }
                });
            }
            Some(EngineLine::Info(info)) => {
                let token = {
                    let mut c = correlation.lock();
                    match c.in_flight.front().copied() {
                        Some(front) if front == c.latest => {
                            c.last_depth = Some(info.depth);
                            Some(front)
                        }
                        _ => None,
                    }
                };
                match token {
                    Some(token) => {
                        let _ = updates.send(AnalysisUpdate {
                            token,
                            result: AnalysisResult::Evaluation {
                                depth: info.depth,
                                score: info.score,
                                pv: info.pv,
                            },
                        });
                    }
                    None => trace!("[ENGINE] Dropped stale info at depth {}", info.depth),
                }
            }
            Some(EngineLine::BestMove(best_move)) => {
                let (current, depth, waiter, idle) = {
                    let mut c = correlation.lock();
                    let answered = c.in_flight.pop_front();
                    let idle = c.in_flight.is_empty();
                    let latest = c.latest;
                    let current = answered.filter(|t| *t == latest);
                    let waiter = match (current, c.pending_best.take()) {
                        (Some(t), Some((pending, tx))) if pending == t => Some(tx),
                        (_, other) => {
                            c.pending_best = other;
                            None
                        }
                    };
                    (current, c.last_depth, waiter, idle)
                };

                if idle {
                    state.send_if_modified(|s| {
                        if *s == EngineState::Searching {
                            *s = EngineState::Ready;
                            true
                        } else {
                            false
                        }
                    });
                }

                match current {
                    Some(token) => {
                        if let Some(tx) = waiter {
                            let _ = tx.send(best_move.clone());
                        }
                        let _ = updates.send(AnalysisUpdate {
                            token,
                            result: AnalysisResult::BestMove { depth, best_move },
                        });
                    }
                    None => debug!("[ENGINE] Dropped stale bestmove {:?}", best_move),
                }
            }
            None => {}
        }
    }

    warn!("[ENGINE] Engine output closed");
    correlation.lock().pending_best = None;
    state.send_replace(EngineState::Terminated);
}
