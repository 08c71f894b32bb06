//! UCI line codec
//!
//! Outbound commands are rendered with [`std::fmt::Display`]; inbound lines
//! are classified by their first token. Only the handful of replies the
//! adapter acts on are recognised, everything else (`id`, `uciok`,
//! `option`, `info string`) parses to `None` and is ignored.

use std::fmt;

/// Tokens that may follow a principal variation on an `info` line
const INFO_KEYWORDS: &[&str] = &[
    "depth", "seldepth", "multipv", "score", "nodes", "nps", "hashfull", "tbhits", "time",
    "currmove", "currmovenumber", "cpuload", "bmc", "string", "refutation", "currline",
];

/// A command sent to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciCommand {
    Uci,
    IsReady,
    SetOption { name: String, value: String },
    Position { fen: String },
    GoDepth(u32),
    GoMoveTime(u64),
    Stop,
    Quit,
}

impl UciCommand {
    pub fn set_option(name: &str, value: impl fmt::Display) -> Self {
        Self::SetOption {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

impl fmt::Display for UciCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UciCommand::Uci => write!(f, "uci"),
            UciCommand::IsReady => write!(f, "isready"),
            UciCommand::SetOption { name, value } => {
                write!(f, "setoption name {} value {}", name, value)
            }
            UciCommand::Position { fen } => write!(f, "position fen {}", fen),
            UciCommand::GoDepth(depth) => write!(f, "go depth {}", depth),
            UciCommand::GoMoveTime(ms) => write!(f, "go movetime {}", ms),
            UciCommand::Stop => write!(f, "stop"),
            UciCommand::Quit => write!(f, "quit"),
        }
    }
}

/// Engine score from the side to move's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    /// Positive: side to move mates in N. Negative: gets mated in N.
    Mate(i32),
}

impl Score {
    /// Evaluation in pawns, or `None` for a mate score
    pub fn pawns(&self) -> Option<f32> {
        match self {
            Score::Centipawns(cp) => Some(*cp as f32 / 100.0),
            Score::Mate(_) => None,
        }
    }

    pub fn mate_in(&self) -> Option<i32> {
        match self {
            Score::Mate(n) => Some(*n),
            Score::Centipawns(_) => None,
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Centipawns(cp) => write!(f, "{:+.2}", *cp as f64 / 100.0),
            Score::Mate(0) => f.write_str("#"),
            Score::Mate(n) if *n > 0 => write!(f, "+M{}", n),
            Score::Mate(n) => write!(f, "-M{}", n.abs()),
        }
    }
}

/// A complete `info` line: both a depth and a score were present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoLine {
    pub depth: u32,
    pub score: Score,
    pub pv: Vec<String>,
}

/// A recognised reply from the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineLine {
    ReadyOk,
    Info(InfoLine),
    /// `None` is the engine's explicit "no move" (`(none)` / `0000`)
    BestMove(Option<String>),
}

impl EngineLine {
    /// Classify one line of engine output.
    ///
    /// Partial `info` lines (no depth, or no score) return `None`; they are
    /// dropped rather than merged with later lines.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let mut tokens = line.split_whitespace();
        match tokens.next()? {
            "readyok" => Some(EngineLine::ReadyOk),
            "info" => parse_info(tokens).map(EngineLine::Info),
            "bestmove" => Some(EngineLine::BestMove(
                tokens.next().filter(|t| is_move_token(t)).map(str::to_string),
            )),
            _ => None,
        }
    }
}

fn parse_info<'a>(tokens: impl Iterator<Item = &'a str>) -> Option<InfoLine> {
    let tokens: Vec<&str> = tokens.collect();
    let mut depth = None;
    let mut score = None;
    let mut pv = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                depth = tokens.get(i + 1).and_then(|t| t.parse::<u32>().ok());
                i += 2;
            }
            "score" => {
                let value = tokens.get(i + 2).and_then(|t| t.parse::<i32>().ok());
                score = match (tokens.get(i + 1).copied(), value) {
                    (Some("cp"), Some(cp)) => Some(Score::Centipawns(cp)),
                    (Some("mate"), Some(n)) => Some(Score::Mate(n)),
                    _ => score,
                };
                i += 3;
            }
            "pv" => {
                i += 1;
                while i < tokens.len() && !INFO_KEYWORDS.contains(&tokens[i]) {
                    pv.push(tokens[i].to_string());
                    i += 1;
                }
            }
            "string" => break,
            _ => i += 1,
        }
    }

    Some(InfoLine {
        depth: depth?,
        score: score?,
        pv,
    })
}

/// Four or five characters: two squares plus an optional promotion letter
pub fn is_move_token(token: &str) -> bool {
    let b = token.as_bytes();
    let square = |file: u8, rank: u8| (b'a'..=b'h').contains(&file) && (b'1'..=b'8').contains(&rank);
    match b.len() {
        4 => square(b[0], b[1]) && square(b[2], b[3]),
        5 => square(b[0], b[1]) && square(b[2], b[3]) && matches!(b[4], b'q' | b'r' | b'b' | b'n'),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_rendering() {
        assert_eq!(UciCommand::GoDepth(15).to_string(), "go depth 15");
        assert_eq!(UciCommand::GoMoveTime(1200).to_string(), "go movetime 1200");
        assert_eq!(
            UciCommand::Position {
                fen: "8/8/8/8/8/8/8/K6k w - - 0 1".to_string()
            }
            .to_string(),
            "position fen 8/8/8/8/8/8/8/K6k w - - 0 1"
        );
    }

    #[test]
    fn test_parse_full_info_line() {
        let line = "info depth 12 seldepth 18 multipv 1 score cp -34 nodes 51234 nps 812000 tbhits 0 time 63 pv e7e5 g1f3 b8c6";
        let Some(EngineLine::Info(info)) = EngineLine::parse(line) else {
            panic!("expected info line");
        };
        assert_eq!(info.depth, 12);
        assert_eq!(info.score, Score::Centipawns(-34));
        assert_eq!(info.score.pawns(), Some(-0.34));
        assert_eq!(info.pv, vec!["e7e5", "g1f3", "b8c6"]);
    }

    #[test]
    fn test_pv_stops_at_trailing_keyword() {
        let line = "info depth 20 score cp 15 pv d2d4 d7d5 bmc 0.42";
        let Some(EngineLine::Info(info)) = EngineLine::parse(line) else {
            panic!("expected info line");
        };
        assert_eq!(info.pv, vec!["d2d4", "d7d5"]);
    }

    #[test]
    fn test_parse_mate_score() {
        let line = "info depth 5 score mate -3 pv h2h3";
        let Some(EngineLine::Info(info)) = EngineLine::parse(line) else {
            panic!("expected info line");
        };
        assert_eq!(info.score.mate_in(), Some(-3));
        assert_eq!(info.score.pawns(), None);
    }

    #[test]
    fn test_partial_info_is_discarded() {
        assert_eq!(EngineLine::parse("info depth 3 currmove e2e4 currmovenumber 1"), None);
        assert_eq!(EngineLine::parse("info score cp 20"), None);
        assert_eq!(EngineLine::parse("info string NNUE evaluation enabled"), None);
    }

    #[test]
    fn test_seldepth_is_not_depth() {
        assert_eq!(EngineLine::parse("info seldepth 9 score cp 20"), None);
    }

    #[test]
    fn test_parse_bestmove() {
        assert_eq!(
            EngineLine::parse("bestmove e2e4 ponder e7e5"),
            Some(EngineLine::BestMove(Some("e2e4".to_string())))
        );
        assert_eq!(
            EngineLine::parse("bestmove a7a8q"),
            Some(EngineLine::BestMove(Some("a7a8q".to_string())))
        );
        assert_eq!(
            EngineLine::parse("bestmove (none)"),
            Some(EngineLine::BestMove(None))
        );
    }

    #[test]
    fn test_other_lines_ignored() {
        assert_eq!(EngineLine::parse("readyok"), Some(EngineLine::ReadyOk));
        assert_eq!(EngineLine::parse("uciok"), None);
        assert_eq!(EngineLine::parse("id name Stockfish 16"), None);
        assert_eq!(EngineLine::parse(""), None);
    }

    #[test]
    fn test_score_display() {
        assert_eq!(Score::Centipawns(125).to_string(), "+1.25");
        assert_eq!(Score::Mate(2).to_string(), "+M2");
        assert_eq!(Score::Mate(-4).to_string(), "-M4");
        // Side to move is already mated
        assert_eq!(Score::Mate(0).to_string(), "#");
    }
}
