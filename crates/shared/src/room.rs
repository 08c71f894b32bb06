use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque identifier of a two-player room.
///
/// Codes are UUID v4 strings. The player who generates a code hosts the
/// room (and plays White); the player who types it in joins as Black.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomCode(String);

#[derive(Debug, thiserror::Error)]
pub enum RoomCodeError {
    #[error("Room code is empty")]
    Empty,

    #[error("Invalid room code '{code}': {source}")]
    Invalid {
        code: String,
        #[source]
        source: uuid::Error,
    },
}

impl RoomCode {
    /// Generate a fresh room code
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Validate a user-supplied code
    pub fn parse(input: &str) -> Result<Self, RoomCodeError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(RoomCodeError::Empty);
        }
        Uuid::parse_str(trimmed).map_err(|source| RoomCodeError::Invalid {
            code: trimmed.to_string(),
            source,
        })?;
        Ok(Self(trimmed.to_string()))
    }

    /// Wrap a code received from the network without validating it
    pub fn from_wire(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomCode {
    type Err = RoomCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
