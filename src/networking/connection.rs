//! Connection lifecycle of the realtime channel
//!
//! ```text
//! Connecting ──> Connected ──> Reconnecting ──> Connected ...
//!      │                            │
//!      └──────────> Failed <────────┘        any ──close──> Disconnected
//! ```
//!
//! State changes are driven only by [`TransportEvent`]s. Game logic never
//! sets a connection state.

use crate::networking::transport::TransportEvent;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No transport, or the transport was closed
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Link lost or refused; further attempts are scheduled
    Reconnecting,
    /// Reconnection attempts are exhausted
    Failed,
}

impl ConnectionState {
    /// Next state after a transport event
    pub fn on_event(self, event: &TransportEvent) -> Self {
        match event {
            TransportEvent::Connected => ConnectionState::Connected,
            TransportEvent::ConnectError { .. } => match self {
                ConnectionState::Connected => ConnectionState::Reconnecting,
                other => other,
            },
            TransportEvent::ReconnectAttempt(_) => ConnectionState::Reconnecting,
            TransportEvent::ReconnectFailed => ConnectionState::Failed,
            TransportEvent::Disconnected => ConnectionState::Disconnected,
            TransportEvent::Message(_) => self,
        }
    }

    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

/// How often and how patiently the client reconnects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay_ms: 1000,
        }
    }
}

impl ReconnectPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ServerMessage;

    #[test]
    fn test_connect_reconnect_cycle() {
        let state = ConnectionState::Connecting
            .on_event(&TransportEvent::Connected)
            .on_event(&TransportEvent::ConnectError {
                message: "reset by peer".into(),
            });
        assert_eq!(state, ConnectionState::Reconnecting);

        let state = state
            .on_event(&TransportEvent::ReconnectAttempt(1))
            .on_event(&TransportEvent::Connected);
        assert_eq!(state, ConnectionState::Connected);
    }

    #[test]
    fn test_exhausted_reconnects_fail() {
        let state = ConnectionState::Connecting
            .on_event(&TransportEvent::ConnectError {
                message: "refused".into(),
            })
            .on_event(&TransportEvent::ReconnectAttempt(5))
            .on_event(&TransportEvent::ReconnectFailed);
        assert_eq!(state, ConnectionState::Failed);
    }

    #[test]
    fn test_messages_do_not_change_state() {
        let state = ConnectionState::Connected
            .on_event(&TransportEvent::Message(ServerMessage::OpponentDisconnected));
        assert_eq!(state, ConnectionState::Connected);
    }

    #[test]
    fn test_default_policy() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.attempts, 5);
        assert_eq!(policy.delay(), Duration::from_secs(1));
    }
}
