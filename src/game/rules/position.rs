use crate::game::error::{GameError, GameResult};
use crate::game::types::{ChessMove, PlayerColor};
use serde::{Deserialize, Serialize};
use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Move, Position as _, Role, Square};
use std::fmt;
use tracing::trace;

/// FEN of the standard starting position
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Halfmove clock value at which the fifty-move rule applies
const FIFTY_MOVE_HALFMOVES: u32 = 100;

/// Why a position ends the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminalReason {
    Checkmate,
    Stalemate,
    ThreefoldRepetition,
    InsufficientMaterial,
    FiftyMove,
}

impl TerminalReason {
    pub fn is_draw(self) -> bool {
        !matches!(self, TerminalReason::Checkmate)
    }
}

impl fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TerminalReason::Checkmate => "checkmate",
            TerminalReason::Stalemate => "stalemate",
            TerminalReason::ThreefoldRepetition => "threefold repetition",
            TerminalReason::InsufficientMaterial => "insufficient material",
            TerminalReason::FiftyMove => "fifty-move rule",
        };
        f.write_str(text)
    }
}

/// Rules-level summary of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RulesStatus {
    pub turn: PlayerColor,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_draw: bool,
    pub draw_reason: Option<TerminalReason>,
}

/// An immutable board state
#[derive(Debug, Clone)]
pub struct Position {
    chess: Chess,
    /// Repetition keys of every position reached, current one last
    repetitions: Vec<String>,
}

impl Default for Position {
    fn default() -> Self {
        Self::from_chess(Chess::default())
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.fen() == other.fen()
    }
}

impl Position {
    fn from_chess(chess: Chess) -> Self {
        let repetitions = vec![repetition_key(&chess)];
        Self { chess, repetitions }
    }

    /// Standard starting position
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a position from FEN. Repetition history starts fresh.
    pub fn from_fen(fen: &str) -> GameResult<Self> {
        let parsed: Fen = fen.trim().parse().map_err(|e| GameError::InvalidPosition {
            message: format!("{}: {}", fen, e),
        })?;
        let chess: Chess =
            parsed
                .into_position(CastlingMode::Standard)
                .map_err(|e| GameError::InvalidPosition {
                    message: format!("{}: {}", fen, e),
                })?;
        Ok(Self::from_chess(chess))
    }

    pub fn fen(&self) -> String {
        to_fen(&self.chess)
    }

    pub fn turn(&self) -> PlayerColor {
        self.chess.turn().into()
    }

    pub fn is_check(&self) -> bool {
        self.chess.is_check()
    }

    /// Apply one move, returning the resulting snapshot.
    ///
    /// A missing promotion on a pawn reaching the last rank promotes to a
    /// queen. `self` is left untouched whether or not the move is legal.
    pub fn apply_move(&self, m: &ChessMove) -> GameResult<Position> {
        let legal = self.find_legal(m).ok_or_else(|| GameError::IllegalMove {
            uci: m.to_uci(),
        })?;
        let chess = self
            .chess
            .clone()
            .play(legal)
            .map_err(|_| GameError::IllegalMove { uci: m.to_uci() })?;

        let mut repetitions = self.repetitions.clone();
        repetitions.push(repetition_key(&chess));
        trace!("[RULES] Applied {}", m);
        Ok(Position { chess, repetitions })
    }

    fn find_legal(&self, m: &ChessMove) -> Option<Move> {
        self.chess.legal_moves().into_iter().find(|legal| {
            match legal.to_uci(CastlingMode::Standard) {
                UciMove::Normal {
                    from,
                    to,
                    promotion,
                } => {
                    let expected = m.promotion.or(promotion.and(Some(Role::Queen)));
                    from == m.from && to == m.to && promotion == expected
                }
                _ => false,
            }
        })
    }

    /// `m` in standard algebraic notation, with a `+` or `#` suffix
    pub fn san(&self, m: &ChessMove) -> GameResult<String> {
        let legal = self.find_legal(m).ok_or_else(|| GameError::IllegalMove {
            uci: m.to_uci(),
        })?;
        Ok(SanPlus::from_move(self.chess.clone(), legal).to_string())
    }

    pub fn fullmove_number(&self) -> u32 {
        self.chess.fullmoves().get()
    }

    /// All legal moves for the side to move
    pub fn legal_moves(&self) -> Vec<ChessMove> {
        self.chess.legal_moves().iter().filter_map(to_chess_move).collect()
    }

    /// The legal move `m` denotes, with a defaulted promotion filled in
    pub fn resolve_move(&self, m: &ChessMove) -> GameResult<ChessMove> {
        self.find_legal(m)
            .as_ref()
            .and_then(to_chess_move)
            .ok_or_else(|| GameError::IllegalMove { uci: m.to_uci() })
    }

    /// Destination squares reachable from `square`.
    ///
    /// Empty when the square is empty or holds a piece of the side not to
    /// move. Promotion choices collapse to one destination.
    pub fn legal_destinations(&self, square: Square) -> Vec<Square> {
        let mut destinations: Vec<Square> = self
            .legal_moves()
            .into_iter()
            .filter(|m| m.from == square)
            .map(|m| m.to)
            .collect();
        destinations.sort();
        destinations.dedup();
        destinations
    }

    /// Why this position ends the game, if it does.
    ///
    /// Draws are checked in the order stalemate, threefold repetition,
    /// insufficient material, fifty-move rule.
    pub fn terminal_reason(&self) -> Option<TerminalReason> {
        if self.chess.is_checkmate() {
            Some(TerminalReason::Checkmate)
        } else if self.chess.is_stalemate() {
            Some(TerminalReason::Stalemate)
        } else if self.is_threefold_repetition() {
            Some(TerminalReason::ThreefoldRepetition)
        } else if self.chess.is_insufficient_material() {
            Some(TerminalReason::InsufficientMaterial)
        } else if self.chess.halfmoves() >= FIFTY_MOVE_HALFMOVES {
            Some(TerminalReason::FiftyMove)
        } else {
            None
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal_reason().is_some()
    }

    pub fn status(&self) -> RulesStatus {
        let reason = self.terminal_reason();
        RulesStatus {
            turn: self.turn(),
            is_check: self.is_check(),
            is_checkmate: reason == Some(TerminalReason::Checkmate),
            is_draw: reason.is_some_and(TerminalReason::is_draw),
            draw_reason: reason.filter(|r| r.is_draw()),
        }
    }

    fn is_threefold_repetition(&self) -> bool {
        let Some(current) = self.repetitions.last() else {
            return false;
        };
        self.repetitions.iter().filter(|key| *key == current).count() >= 3
    }
}

fn to_chess_move(legal: &Move) -> Option<ChessMove> {
    match legal.to_uci(CastlingMode::Standard) {
        UciMove::Normal {
            from,
            to,
            promotion,
        } => Some(ChessMove {
            from,
            to,
            promotion,
        }),
        _ => None,
    }
}

fn to_fen(chess: &Chess) -> String {
    Fen::from_position(chess, EnPassantMode::Legal).to_string()
}

/// Placement, side to move, castling rights and en passant square
fn repetition_key(chess: &Chess) -> String {
    to_fen(chess)
        .split_whitespace()
        .take(4)
        .collect::<Vec<_>>()
        .join(" ")
}
