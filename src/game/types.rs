//! Type definitions for moves and sides
//!
//! [`ChessMove`] is the application's move intent: an origin square, a
//! destination square and an optional promotion piece. It carries no
//! legality of its own; validity is only defined against a
//! [`Position`](crate::game::rules::Position).

use crate::game::error::{GameError, GameResult};
use serde::{Deserialize, Serialize};
use shakmaty::{Color, Role, Square};
use shared::MovePayload;
use std::fmt;
use std::str::FromStr;

/// Side of the board a participant plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    #[default]
    White,
    Black,
}

impl PlayerColor {
    pub fn opponent(self) -> Self {
        match self {
            PlayerColor::White => PlayerColor::Black,
            PlayerColor::Black => PlayerColor::White,
        }
    }
}

impl From<Color> for PlayerColor {
    fn from(color: Color) -> Self {
        match color {
            Color::White => PlayerColor::White,
            Color::Black => PlayerColor::Black,
        }
    }
}

impl From<PlayerColor> for Color {
    fn from(color: PlayerColor) -> Self {
        match color {
            PlayerColor::White => Color::White,
            PlayerColor::Black => Color::Black,
        }
    }
}

impl fmt::Display for PlayerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerColor::White => write!(f, "white"),
            PlayerColor::Black => write!(f, "black"),
        }
    }
}

impl FromStr for PlayerColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "white" | "w" => Ok(PlayerColor::White),
            "black" | "b" => Ok(PlayerColor::Black),
            other => Err(format!("unknown color '{}', expected white or black", other)),
        }
    }
}

/// A move intent in origin/destination form
///
/// Castling is expressed as the king's two-square step (`e1g1`), the same
/// way the UCI text token writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChessMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
}

impl ChessMove {
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    pub fn with_promotion(mut self, role: Role) -> Self {
        self.promotion = Some(role);
        self
    }

    /// Parse a 4-5 character token such as `e2e4` or `a7a8q`
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let m = ChessMove::from_uci("e7e8q")?;
    /// assert_eq!(m.promotion, Some(Role::Queen));
    /// ```
    pub fn from_uci(token: &str) -> GameResult<Self> {
        let token = token.trim();
        let malformed = || GameError::MalformedMove {
            message: format!("'{}' is not a move token", token),
        };
        if !token.is_ascii() || !(4..=5).contains(&token.len()) {
            return Err(malformed());
        }

        let from = Square::from_ascii(token[0..2].as_bytes()).map_err(|_| malformed())?;
        let to = Square::from_ascii(token[2..4].as_bytes()).map_err(|_| malformed())?;
        let promotion = match token[4..].chars().next() {
            None => None,
            Some(c) => Some(parse_promotion(c).ok_or_else(malformed)?),
        };

        Ok(Self {
            from,
            to,
            promotion,
        })
    }

    pub fn to_uci(&self) -> String {
        self.to_string()
    }
}

/// Promotion letters accepted on the wire (lowercase or uppercase)
fn parse_promotion(c: char) -> Option<Role> {
    match Role::from_char(c.to_ascii_lowercase()) {
        Some(role @ (Role::Queen | Role::Rook | Role::Bishop | Role::Knight)) => Some(role),
        _ => None,
    }
}

impl fmt::Display for ChessMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(role) = self.promotion {
            write!(f, "{}", role.char())?;
        }
        Ok(())
    }
}

impl FromStr for ChessMove {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_uci(s)
    }
}

impl From<&ChessMove> for MovePayload {
    fn from(m: &ChessMove) -> Self {
        MovePayload::new(m.from.to_string(), m.to.to_string(), m.promotion.map(|r| r.char()))
    }
}

impl TryFrom<&MovePayload> for ChessMove {
    type Error = GameError;

    fn try_from(payload: &MovePayload) -> Result<Self, Self::Error> {
        let malformed = |what: &str| GameError::MalformedMove {
            message: format!("invalid {} in {:?}", what, payload),
        };
        let from = payload
            .from
            .parse::<Square>()
            .map_err(|_| malformed("origin"))?;
        let to = payload
            .to
            .parse::<Square>()
            .map_err(|_| malformed("destination"))?;
        let promotion = match payload.promotion.as_deref() {
            None | Some("") => None,
            Some(p) => {
                let mut chars = p.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(parse_promotion(c).ok_or_else(|| malformed("promotion"))?),
                    _ => return Err(malformed("promotion")),
                }
            }
        };
        Ok(Self {
            from,
            to,
            promotion,
        })
    }
}
