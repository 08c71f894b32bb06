//! Relay backend - pairs two clients per room and forwards their moves
//!
//! # Module Structure
//!
//! - `rooms` - [`GameRooms`], the room table
//! - `server` - the axum `/ws` endpoint

pub mod rooms;
pub mod server;

pub use rooms::{ConnectionId, GameRooms, JoinOutcome, Vacancy};
pub use server::{router, serve, RelayState, DEFAULT_REJOIN_GRACE};
