use serde::{Deserialize, Serialize};

/// A move as it travels over the wire: square names plus an optional
/// promotion letter (`q`, `r`, `b`, `n`).
///
/// The relay forwards this verbatim; legality is only ever decided by the
/// receiving client against its own position.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MovePayload {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<String>,
}

impl MovePayload {
    pub fn new(from: impl Into<String>, to: impl Into<String>, promotion: Option<char>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            promotion: promotion.map(|p| p.to_string()),
        }
    }
}

/// Messages a client sends to the relay
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    JoinGame { code: String },
    Move(MovePayload),
}

/// Messages the relay sends to a client
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    StartGame,
    NewMove(MovePayload),
    OpponentDisconnected,
    Error { message: String },
}

impl ClientMessage {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}

impl ServerMessage {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}
