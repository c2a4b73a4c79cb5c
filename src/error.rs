use thiserror::Error;

use crate::connection::ConnectionId;
use crate::room::RoomId;

/// Why a connection could not be placed into a room.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    #[error("room {0} not found")]
    NotFound(RoomId),

    #[error("room {0} is full")]
    Full(RoomId),
}

impl RoomError {
    /// WebSocket close code sent to a client whose join was rejected.
    pub fn close_code(&self) -> u16 {
        match self {
            RoomError::NotFound(_) => 4004,
            RoomError::Full(_) => 4009,
        }
    }
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    /// The socket writer behind the connection has gone away.
    #[error("connection {0} is closed")]
    Closed(ConnectionId),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
