//! Wire types shared by the chessduel client and the relay backend.
//!
//! The realtime channel carries JSON text frames. Every frame is an object
//! with an `event` name and an optional `data` payload, mirroring the event
//! vocabulary of the relay:
//!
//! | Direction        | Event                   | Payload                      |
//! |------------------|-------------------------|------------------------------|
//! | client → relay   | `join-game`             | `{ code }`                   |
//! | relay → client   | `start-game`            | none                         |
//! | client → relay   | `move`                  | `{ from, to, promotion? }`   |
//! | relay → client   | `new-move`              | `{ from, to, promotion? }`   |
//! | relay → client   | `opponent-disconnected` | none                         |
//! | relay → client   | `error`                 | `{ message }`                |

pub mod protocol;
pub mod room;

pub use protocol::{ClientMessage, MovePayload, ServerMessage};
pub use room::{RoomCode, RoomCodeError};
