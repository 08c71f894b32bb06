//! Game session controller - the player-facing contract
//!
//! The controller is the single owner of the current [`Position`]. Every
//! accepted move, local or remote, replaces it in one step while the
//! controller holds `&mut self`, so there is never a partially applied move.
//!
//! # Modes
//!
//! - **Single-player**: a local move is validated and applied, then the
//!   analysis engine is asked for a reply. An engine that is missing, slow
//!   or returns nothing usable is replaced by a uniformly random legal move.
//! - **Multiplayer**: a local move is validated, applied and broadcast
//!   through the [`SessionSynchronizer`]. Remote moves only arrive through
//!   [`GameController::next_session_updates`] or
//!   [`GameController::poll_session`].
//!
//! Move intents that are illegal, out of turn, made while waiting for the
//! opponent, or made after the game ended are rejected without touching any
//! state.

use crate::game::error::{GameError, GameResult};
use crate::game::mode::{clamp_level, evaluation_depth, think_time, GameMode};
use crate::game::rules::Position;
use crate::game::status::{derive_status, GameStatus, StatusInputs};
use crate::game::types::{ChessMove, PlayerColor};
use crate::networking::{
    ConnectionState, ReconnectPolicy, SessionSynchronizer, SessionUpdate, Transport,
    WebSocketTransport,
};
use rand::seq::IndexedRandom;
use serde::Serialize;
use shakmaty::Square;
use shared::RoomCode;
use stockfish_bridge::{
    AnalysisEngine, AnalysisResult, AnalysisUpdate, EngineConfig, RequestToken, Score,
};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Latest background evaluation, from the side to move's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub depth: u32,
    pub score: Score,
}

/// Read-only view of the game for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameSnapshot {
    pub fen: String,
    pub turn: PlayerColor,
    pub status: GameStatus,
    pub connection: ConnectionState,
    pub local_color: PlayerColor,
    pub last_move: Option<String>,
    /// Moves in UCI notation, oldest first
    pub move_history: Vec<String>,
    /// The same moves in standard algebraic notation
    pub san_history: Vec<String>,
    /// Numbered movetext such as `1. e4 c5 2. Nf3`
    pub pgn: String,
    /// Evaluation text such as `+0.31` or `-M3`
    pub evaluation: Option<String>,
}

/// Result of a local move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    /// The move as applied, with any defaulted promotion filled in
    pub played: ChessMove,
    /// The engine's answer in single-player mode
    pub reply: Option<ChessMove>,
}

pub struct GameController {
    mode: GameMode,
    local_color: PlayerColor,
    /// Where `history` starts from
    start: Position,
    position: Position,
    history: Vec<ChessMove>,
    engine_config: EngineConfig,
    engine: Option<AnalysisEngine>,
    analysis: Option<broadcast::Receiver<AnalysisUpdate>>,
    show_evaluation: bool,
    evaluation_token: Option<RequestToken>,
    evaluation: Option<Evaluation>,
    session: Option<SessionSynchronizer>,
}

impl GameController {
    fn new(mode: GameMode, local_color: PlayerColor) -> Self {
        Self {
            mode,
            local_color,
            start: Position::new(),
            position: Position::new(),
            history: Vec::new(),
            engine_config: EngineConfig::default(),
            engine: None,
            analysis: None,
            show_evaluation: false,
            evaluation_token: None,
            evaluation: None,
            session: None,
        }
    }

    /// A game against the analysis engine at `level` (0..=20)
    pub fn new_single_player(local_color: PlayerColor, level: u8, engine_config: EngineConfig) -> Self {
        let level = clamp_level(i32::from(level));
        let mut controller = Self::new(GameMode::SinglePlayer { level }, local_color);
        controller.engine_config = engine_config;
        controller
    }

    /// A game against a remote peer. The room creator plays white.
    pub fn new_multiplayer(room: RoomCode, local_color: PlayerColor) -> Self {
        let mut controller = Self::new(GameMode::Multiplayer { room: room.clone() }, local_color);
        controller.session = Some(SessionSynchronizer::new(Some(room), local_color));
        controller
    }

    pub fn set_show_evaluation(&mut self, show: bool) {
        self.show_evaluation = show;
        if !show {
            self.evaluation = None;
            self.evaluation_token = None;
        }
    }

    /// Start the configured engine process. A failed start leaves the
    /// controller on random replies.
    pub fn open_engine(&mut self) {
        let engine = AnalysisEngine::open(self.engine_config.clone());
        self.attach_engine(engine);
    }

    /// Use an already constructed engine adapter
    pub fn attach_engine(&mut self, engine: AnalysisEngine) {
        if let GameMode::SinglePlayer { level } = self.mode {
            if engine.is_available() {
                engine.set_difficulty(i32::from(level));
            } else {
                warn!("[CONTROLLER] Analysis engine unavailable; replies will be random");
            }
        }
        self.analysis = Some(engine.subscribe());
        self.engine = Some(engine);
    }

    /// Connect the multiplayer session over WebSockets
    pub fn connect(&mut self, url: &str, policy: ReconnectPolicy) -> GameResult<()> {
        let transport = WebSocketTransport::connect(url, policy)?;
        self.attach_transport(Box::new(transport));
        Ok(())
    }

    /// Use an already constructed transport for the multiplayer session
    pub fn attach_transport(&mut self, transport: Box<dyn Transport>) {
        match self.session.as_mut() {
            Some(session) => session.open(transport),
            None => warn!("[CONTROLLER] Ignoring transport in single-player mode"),
        }
    }

    /// Tear down the engine process and the realtime link
    pub async fn close(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.terminate();
        }
        self.analysis = None;
        if let Some(session) = self.session.as_mut() {
            session.close().await;
        }
        info!("[CONTROLLER] Closed");
    }

    /// Begin play. In single-player mode with the local player on black the
    /// engine makes the first move.
    pub async fn start(&mut self) -> Option<ChessMove> {
        let reply = self.play_engine_reply().await;
        self.request_evaluation().await;
        reply
    }

    pub fn mode(&self) -> &GameMode {
        &self.mode
    }

    pub fn local_color(&self) -> PlayerColor {
        self.local_color
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn history(&self) -> &[ChessMove] {
        &self.history
    }

    pub fn session(&self) -> Option<&SessionSynchronizer> {
        self.session.as_ref()
    }

    pub fn evaluation(&self) -> Option<Evaluation> {
        self.evaluation
    }

    pub fn connection(&self) -> ConnectionState {
        self.session
            .as_ref()
            .map(SessionSynchronizer::connection)
            .unwrap_or_default()
    }

    /// Recomputed from scratch on every call
    pub fn status(&self) -> GameStatus {
        let session = self.session.as_ref();
        derive_status(&StatusInputs {
            position: &self.position,
            connection: self.connection(),
            local_color: self.local_color,
            multiplayer: self.mode.is_multiplayer(),
            peer_present: session.is_some_and(SessionSynchronizer::game_started),
            opponent_disconnected: session.is_some_and(SessionSynchronizer::opponent_disconnected),
        })
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let (san_history, pgn) = self.notation();
        GameSnapshot {
            fen: self.position.fen(),
            turn: self.position.turn(),
            status: self.status(),
            connection: self.connection(),
            local_color: self.local_color,
            last_move: self.history.last().map(ChessMove::to_uci),
            move_history: self.history.iter().map(ChessMove::to_uci).collect(),
            san_history,
            pgn,
            evaluation: self.evaluation.map(|e| e.score.to_string()),
        }
    }

    /// Replay the history from the start position in algebraic notation
    fn notation(&self) -> (Vec<String>, String) {
        let mut position = self.start.clone();
        let mut sans = Vec::with_capacity(self.history.len());
        let mut movetext = String::new();
        for m in &self.history {
            let san = match position.san(m) {
                Ok(san) => san,
                Err(e) => {
                    warn!("[CONTROLLER] History does not replay at {}: {}", m, e);
                    break;
                }
            };
            let number = position.fullmove_number();
            match position.turn() {
                PlayerColor::White => movetext.push_str(&format!("{}. {} ", number, san)),
                PlayerColor::Black if sans.is_empty() => {
                    movetext.push_str(&format!("{}... {} ", number, san))
                }
                PlayerColor::Black => movetext.push_str(&format!("{} ", san)),
            }
            match position.apply_move(m) {
                Ok(next) => position = next,
                Err(_) => break,
            }
            sans.push(san);
        }
        (sans, movetext.trim_end().to_string())
    }

    /// Move hints for `square`; empty unless it holds a piece of the side
    /// to move
    pub fn legal_destinations(&self, square: Square) -> Vec<Square> {
        self.position.legal_destinations(square)
    }

    /// Replace the position with one loaded from FEN and clear the history.
    /// Multiplayer games always start from the initial position.
    pub fn load_position(&mut self, fen: &str) -> GameResult<()> {
        if self.mode.is_multiplayer() {
            return Err(GameError::InvalidPosition {
                message: "custom positions are single-player only".to_string(),
            });
        }
        self.start = Position::from_fen(fen)?;
        self.position = self.start.clone();
        self.history.clear();
        self.evaluation = None;
        self.evaluation_token = None;
        info!("[CONTROLLER] Loaded position {}", fen);
        Ok(())
    }

    /// Start over from the initial position against the same engine.
    /// Call [`GameController::start`] afterwards so the engine can open.
    pub fn new_game(&mut self) -> GameResult<()> {
        if self.mode.is_multiplayer() {
            return Err(GameError::InvalidPosition {
                message: "multiplayer games cannot be restarted".to_string(),
            });
        }
        self.start = Position::new();
        self.position = Position::new();
        self.history.clear();
        self.evaluation = None;
        self.evaluation_token = None;
        info!("[CONTROLLER] New game");
        Ok(())
    }

    /// Validate and apply a local move, broadcasting it in multiplayer mode.
    /// Does not ask the engine for a reply.
    pub fn apply_local_move(&mut self, m: ChessMove) -> GameResult<ChessMove> {
        match self.status() {
            GameStatus::Over(reason) => return Err(GameError::GameOver { reason }),
            GameStatus::AwaitingPeer => return Err(GameError::AwaitingPeer),
            _ => {}
        }
        let turn = self.position.turn();
        if turn != self.local_color {
            return Err(GameError::OutOfTurn { turn });
        }

        let played = self.position.resolve_move(&m)?;
        let next = self.position.apply_move(&played)?;
        self.commit(next, played);
        info!("[CONTROLLER] Local move {}", played);

        if let Some(session) = self.session.as_mut() {
            if let Err(e) = session.send_local_move(&played) {
                error!("[CONTROLLER] Move {} applied but not sent: {}", played, e);
            }
        }
        Ok(played)
    }

    /// Apply a local move and, in single-player mode, the engine's reply
    pub async fn submit_move(&mut self, m: ChessMove) -> GameResult<MoveOutcome> {
        let played = self.apply_local_move(m)?;
        let reply = self.play_engine_reply().await;
        self.request_evaluation().await;
        Ok(MoveOutcome { played, reply })
    }

    fn commit(&mut self, next: Position, played: ChessMove) {
        self.position = next;
        self.history.push(played);
        self.evaluation = None;
    }

    /// Let the engine move if it is its turn in a live single-player game
    async fn play_engine_reply(&mut self) -> Option<ChessMove> {
        let GameMode::SinglePlayer { level } = self.mode else {
            return None;
        };
        if self.position.turn() == self.local_color || self.position.is_terminal() {
            return None;
        }

        let suggestion = match &self.engine {
            Some(engine) => {
                engine
                    .get_best_move(&self.position.fen(), think_time(level))
                    .await
            }
            None => None,
        };
        let chosen = suggestion.and_then(|uci| match ChessMove::from_uci(&uci) {
            Ok(m) => self.position.resolve_move(&m).ok(),
            Err(e) => {
                warn!("[CONTROLLER] Engine suggested unusable move '{}': {}", uci, e);
                None
            }
        });

        let reply = match chosen {
            Some(m) => m,
            None => {
                let fallback = *self.position.legal_moves().choose(&mut rand::rng())?;
                warn!("[CONTROLLER] No engine move, playing random {}", fallback);
                fallback
            }
        };

        match self.position.apply_move(&reply) {
            Ok(next) => {
                self.commit(next, reply);
                info!("[CONTROLLER] Engine move {}", reply);
                Some(reply)
            }
            Err(e) => {
                error!("[CONTROLLER] Resolved engine move rejected: {}", e);
                None
            }
        }
    }

    /// Start a background evaluation of the current position
    async fn request_evaluation(&mut self) {
        let GameMode::SinglePlayer { level } = self.mode else {
            return;
        };
        if !self.show_evaluation || self.position.is_terminal() {
            return;
        }
        let Some(engine) = self.engine.as_ref().filter(|e| e.is_available()) else {
            return;
        };
        match engine
            .evaluate_position(&self.position.fen(), evaluation_depth(level))
            .await
        {
            Ok(token) => self.evaluation_token = Some(token),
            Err(e) => debug!("[CONTROLLER] Evaluation not started: {}", e),
        }
    }

    /// Drain pending analysis results, keeping the newest evaluation of the
    /// current request
    pub fn poll_analysis(&mut self) -> Option<Evaluation> {
        let Some(updates) = self.analysis.as_mut() else {
            return self.evaluation;
        };
        loop {
            match updates.try_recv() {
                Ok(AnalysisUpdate {
                    token,
                    result: AnalysisResult::Evaluation { depth, score, .. },
                }) if Some(token) == self.evaluation_token => {
                    self.evaluation = Some(Evaluation { depth, score });
                }
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!("[CONTROLLER] Skipped {} stale analysis updates", skipped);
                }
                Err(_) => break,
            }
        }
        self.evaluation
    }

    /// Wait for the next transport event and apply it
    pub async fn next_session_updates(&mut self) -> Option<Vec<SessionUpdate>> {
        let session = self.session.as_mut()?;
        let event = session.next_event().await?;
        let updates = session.handle_event(event, &mut self.position);
        self.record_remote_moves(&updates);
        Some(updates)
    }

    /// Apply every transport event that is already waiting
    pub fn poll_session(&mut self) -> Vec<SessionUpdate> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        let mut updates = Vec::new();
        while let Some(event) = session.try_next_event() {
            updates.extend(session.handle_event(event, &mut self.position));
        }
        self.record_remote_moves(&updates);
        updates
    }

    fn record_remote_moves(&mut self, updates: &[SessionUpdate]) {
        for update in updates {
            if let SessionUpdate::RemoteMoveApplied(m) = update {
                self.history.push(*m);
                info!("[CONTROLLER] Remote move {}", m);
            }
        }
    }
}
