//! Two-party WebRTC signaling relay.
//!
//! Clients rendezvous in short-lived rooms of two and exchange opaque
//! `{kind, data}` messages (SDP offers and answers, ICE candidates) over a
//! WebSocket. The relay never looks inside a message; it only pairs peers,
//! forwards to the other side and forgets a room once both have left.
//!
//! - `GET /create_room` - new empty room, `{"room_id": "..."}`
//! - `GET /join_random_room` - an open room, created if none exists
//! - `GET /rooms` - `{"rooms": [...], "length": n}`
//! - `GET /ws/{room_id}` - join and relay

pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod registry;
pub mod room;

pub use config::SignalConfig;
pub use connection::{Connection, ConnectionId};
pub use error::{ConfigError, DeliveryError, RoomError};
pub use handler::{AppState, router};
pub use protocol::SignalMessage;
pub use registry::RoomRegistry;
pub use room::{ROOM_CAPACITY, Room, RoomId};
