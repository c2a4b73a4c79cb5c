use std::fmt;

use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::DeliveryError;
use crate::protocol::SignalMessage;

/// Identity of one accepted socket. Two handles are the same connection iff their ids match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Handle to a client's outbound signaling channel.
///
/// The socket itself is owned by the session's writer task; this only holds the
/// sending half of the queue feeding it, so cloning is cheap and delivery never
/// waits on the network.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<Message>,
}

impl Connection {
    pub fn new(outbound: mpsc::UnboundedSender<Message>) -> Self {
        Self::with_id(ConnectionId::new(), outbound)
    }

    pub fn with_id(id: ConnectionId, outbound: mpsc::UnboundedSender<Message>) -> Self {
        Self { id, outbound }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }

    /// Queues `message` as a JSON text frame. All or nothing: either the whole
    /// frame is queued or an error is returned.
    pub fn deliver(&self, message: &SignalMessage) -> Result<(), DeliveryError> {
        let json = serde_json::to_string(message)?;
        self.outbound
            .send(Message::Text(json.into()))
            .map_err(|_| DeliveryError::Closed(self.id))
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Connection {}
