use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rand::seq::IndexedRandom;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_ROOM_ID_LEN;
use crate::connection::{Connection, ConnectionId};
use crate::error::RoomError;
use crate::protocol::SignalMessage;
use crate::room::{Room, RoomId};

/// How many times `join_available` re-picks after losing a race for a room.
pub const JOIN_ATTEMPTS: usize = 8;

/// Owns every live room and routes joins, leaves and relays to them.
///
/// Lock order is always map shard, then room. The map lock is only held to
/// fetch, insert or delete a room handle and never while delivering.
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: DashMap<RoomId, Arc<Room>>,
    id_len: usize,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_ROOM_ID_LEN)
    }
}

impl RoomRegistry {
    pub fn new(id_len: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            id_len,
        }
    }

    /// Inserts an empty room under a fresh id. Ids that collide with a live
    /// room are regenerated.
    pub fn create_room(&self) -> RoomId {
        loop {
            let id = RoomId::generate(self.id_len);
            if let Entry::Vacant(entry) = self.rooms.entry(id.clone()) {
                entry.insert(Arc::new(Room::new(id.clone())));
                info!(room = %id, "room created");
                return id;
            }
        }
    }

    pub fn get_room(&self, id: &RoomId) -> Option<Arc<Room>> {
        self.rooms.get(id).map(|room| Arc::clone(room.value()))
    }

    /// Places `conn` into room `id`.
    pub fn connect_to_room(&self, id: &RoomId, conn: Connection) -> Result<Arc<Room>, RoomError> {
        let conn_id = conn.id();
        // Holding the shard guard across `add` keeps a concurrent
        // delete-on-empty from removing the room between lookup and insert.
        let room = self
            .rooms
            .get(id)
            .ok_or_else(|| RoomError::NotFound(id.clone()))?;
        room.add(conn)?;
        info!(room = %id, conn = %conn_id, participants = room.len(), "joined room");
        Ok(Arc::clone(room.value()))
    }

    /// Removes `conn` from room `id`, deleting the room once nobody is left.
    /// Unknown rooms and non-members are ignored.
    pub fn disconnect_from_room(&self, id: &RoomId, conn: ConnectionId) {
        let Some(room) = self.get_room(id) else {
            return;
        };
        if !room.remove(conn) {
            return;
        }
        info!(room = %id, conn = %conn, participants = room.len(), "left room");

        // Re-checked under the shard write lock: a join that slipped in after
        // the removal above keeps the room alive.
        let removed = self
            .rooms
            .remove_if(id, |_, current| Arc::ptr_eq(current, &room) && current.is_empty());
        if removed.is_some() {
            info!(room = %id, "room deleted");
        }
    }

    /// Snapshot of live room ids, in no particular order.
    pub fn list_rooms(&self) -> Vec<RoomId> {
        self.rooms.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn participant_count(&self, id: &RoomId) -> Option<usize> {
        self.rooms.get(id).map(|room| room.len())
    }

    /// Id of a random room with a free seat, creating one when none exists.
    ///
    /// The room may fill up before the caller joins it; callers must treat a
    /// rejected join as "pick again".
    pub fn find_available_room(&self) -> RoomId {
        let open: Vec<RoomId> = self
            .rooms
            .iter()
            .filter(|entry| !entry.value().is_full())
            .map(|entry| entry.key().clone())
            .collect();

        match open.choose(&mut rand::rng()) {
            Some(id) => id.clone(),
            None => self.create_room(),
        }
    }

    /// Joins any room with a free seat, retrying when a picked room is taken
    /// or deleted before the join lands.
    pub fn join_available(&self, conn: Connection) -> Result<Arc<Room>, RoomError> {
        for attempt in 1..JOIN_ATTEMPTS {
            let id = self.find_available_room();
            match self.connect_to_room(&id, conn.clone()) {
                Ok(room) => return Ok(room),
                Err(e) => debug!(attempt, "{e}, picking another room"),
            }
        }

        let id = self.find_available_room();
        self.connect_to_room(&id, conn)
    }

    /// Broadcasts `message` from `sender` and disconnects every participant
    /// that could not be reached.
    pub fn relay(&self, room: &Room, message: &SignalMessage, sender: ConnectionId) {
        for dead in room.broadcast(message, sender) {
            warn!(room = %room.id(), conn = %dead, "dropping unreachable participant");
            self.disconnect_from_room(room.id(), dead);
        }
    }
}
