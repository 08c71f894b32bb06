//! Networking module - realtime link to the remote player
//!
//! # Module Structure
//!
//! - `connection` - [`ConnectionState`] transitions and [`ReconnectPolicy`]
//! - `transport` - the [`Transport`] trait and the in-memory [`ChannelTransport`]
//! - `websocket` - [`WebSocketTransport`], the production client
//! - `session` - [`SessionSynchronizer`], which turns transport events into
//!   session facts and validated remote moves

pub mod connection;
pub mod session;
pub mod transport;
pub mod websocket;

// Re-export commonly used items
pub use connection::{ConnectionState, ReconnectPolicy};
pub use session::{SessionSynchronizer, SessionUpdate};
pub use transport::{
    ChannelPeer, ChannelTransport, Transport, TransportError, TransportEvent, TransportResult,
};
pub use websocket::WebSocketTransport;
