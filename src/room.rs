use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::connection::{Connection, ConnectionId};
use crate::error::RoomError;
use crate::protocol::SignalMessage;

/// Maximum number of participants in one room. Signaling is strictly
/// peer-to-peer, and this is the only place that assumption lives.
pub const ROOM_CAPACITY: usize = 2;

/// Short alphanumeric token naming a live room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Random token of `len` characters drawn from `[A-Za-z0-9]`.
    pub fn generate(len: usize) -> Self {
        let token = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect();
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RoomId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Membership list that cannot grow past [`ROOM_CAPACITY`]. Join order is kept.
#[derive(Debug, Default)]
struct Participants(Vec<Connection>);

impl Participants {
    fn try_push(&mut self, conn: Connection) -> Result<(), Connection> {
        if self.0.len() >= ROOM_CAPACITY {
            return Err(conn);
        }
        self.0.push(conn);
        Ok(())
    }

    fn remove(&mut self, id: ConnectionId) -> bool {
        let before = self.0.len();
        self.0.retain(|c| c.id() != id);
        self.0.len() != before
    }
}

/// One signaling session: up to two connections relaying to each other.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    participants: Mutex<Participants>,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            participants: Mutex::new(Participants::default()),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    // Membership is a plain Vec, a panic mid-update cannot leave it torn.
    fn participants(&self) -> MutexGuard<'_, Participants> {
        self.participants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.participants().0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= ROOM_CAPACITY
    }

    /// Member ids in join order.
    pub fn members(&self) -> Vec<ConnectionId> {
        self.participants().0.iter().map(Connection::id).collect()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.participants().0.iter().any(|c| c.id() == id)
    }

    /// Appends `conn`. Capacity is checked under the room lock, so concurrent
    /// joins can never overfill the room.
    pub fn add(&self, conn: Connection) -> Result<(), RoomError> {
        self.participants()
            .try_push(conn)
            .map_err(|_| RoomError::Full(self.id.clone()))
    }

    /// Removes the connection if present. Removing a non-member is a no-op and
    /// returns `false`, so duplicate disconnect events are harmless.
    pub fn remove(&self, id: ConnectionId) -> bool {
        self.participants().remove(id)
    }

    /// Sends `message` to every participant except `sender`.
    ///
    /// Recipients are snapshotted and the lock released before any delivery.
    /// A failed delivery does not stop the others; the ids of connections that
    /// could not be reached are returned so the caller can drop them.
    pub fn broadcast(&self, message: &SignalMessage, sender: ConnectionId) -> Vec<ConnectionId> {
        let recipients: Vec<Connection> = self
            .participants()
            .0
            .iter()
            .filter(|c| c.id() != sender)
            .cloned()
            .collect();

        let mut failed = Vec::new();
        for recipient in recipients {
            match recipient.deliver(message) {
                Ok(()) => debug!(
                    room = %self.id,
                    from = %sender,
                    to = %recipient.id(),
                    kind = %message.kind,
                    "relayed signal"
                ),
                Err(e) => {
                    warn!(room = %self.id, "{e}");
                    failed.push(recipient.id());
                }
            }
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::tests::{recv_signal, test_connection};

    #[test]
    fn test_generated_id_shape() {
        let id = RoomId::generate(8);
        assert_eq!(id.as_str().len(), 8);
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_add_respects_capacity() {
        let room = Room::new(RoomId::from("AB12CD34"));
        let (x, _rx_x) = test_connection();
        let (y, _rx_y) = test_connection();
        let (z, _rx_z) = test_connection();

        room.add(x.clone()).unwrap();
        room.add(y.clone()).unwrap();
        assert!(room.is_full());

        let err = room.add(z).unwrap_err();
        assert_eq!(err, RoomError::Full(RoomId::from("AB12CD34")));
        assert_eq!(room.members(), vec![x.id(), y.id()]);
    }

    #[test]
    fn test_remove_is_lenient() {
        let room = Room::new(RoomId::from("r"));
        let (x, _rx) = test_connection();
        room.add(x.clone()).unwrap();

        assert!(room.remove(x.id()));
        assert!(!room.remove(x.id()));
        assert!(room.is_empty());
    }

    #[test]
    fn test_broadcast_skips_sender() {
        let room = Room::new(RoomId::from("r"));
        let (x, mut rx_x) = test_connection();
        let (y, mut rx_y) = test_connection();
        room.add(x.clone()).unwrap();
        room.add(y.clone()).unwrap();

        let offer = SignalMessage::new("offer", "v=0");
        let failed = room.broadcast(&offer, x.id());

        assert!(failed.is_empty());
        assert_eq!(recv_signal(&mut rx_y), Some(offer));
        assert_eq!(recv_signal(&mut rx_x), None);
    }

    #[test]
    fn test_broadcast_reports_dead_recipient() {
        let room = Room::new(RoomId::from("r"));
        let (x, _rx_x) = test_connection();
        let (y, rx_y) = test_connection();
        room.add(x.clone()).unwrap();
        room.add(y.clone()).unwrap();
        drop(rx_y);

        let failed = room.broadcast(&SignalMessage::new("ice-candidate", "c"), x.id());
        assert_eq!(failed, vec![y.id()]);
        // The room itself is untouched; removal is the caller's call.
        assert_eq!(room.len(), 2);
    }

    #[test]
    fn test_broadcast_in_lone_room_delivers_nothing() {
        let room = Room::new(RoomId::from("r"));
        let (x, mut rx_x) = test_connection();
        room.add(x.clone()).unwrap();

        assert!(room.broadcast(&SignalMessage::new("offer", "x"), x.id()).is_empty());
        assert_eq!(recv_signal(&mut rx_x), None);
    }
}
