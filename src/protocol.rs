use serde::{Deserialize, Serialize};

use crate::room::RoomId;

/// Signaling payload relayed between the two peers of a room.
///
/// `kind` is a hint for the remote peer ("offer", "answer", "ice-candidate", ...)
/// and `data` carries the SDP or candidate text. Neither is inspected here.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SignalMessage {
    pub kind: String,
    pub data: String,
}

impl SignalMessage {
    pub fn new(kind: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data: data.into(),
        }
    }
}

// HTTP response bodies

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RoomIdResponse {
    pub room_id: RoomId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RoomListResponse {
    pub rooms: Vec<RoomId>,
    pub length: usize,
}

impl From<Vec<RoomId>> for RoomListResponse {
    fn from(rooms: Vec<RoomId>) -> Self {
        let length = rooms.len();
        Self { rooms, length }
    }
}
