//! Room membership with a reverse index per connection.

use std::collections::HashSet;

use dashmap::DashMap;

use memberhub_core::types::ConnectionId;

use super::types::RoomName;

/// Which connections are in which rooms.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    /// Room → member connections.
    rooms: DashMap<RoomName, HashSet<ConnectionId>>,
    /// Connection → joined rooms, for cleanup on disconnect.
    joined: DashMap<ConnectionId, HashSet<RoomName>>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `conn` to `room`. Returns `false` if it was already a member.
    pub fn join(&self, room: RoomName, conn: ConnectionId) -> bool {
        let added = self.rooms.entry(room).or_default().insert(conn);
        if added {
            self.joined.entry(conn).or_default().insert(room);
        }
        added
    }

    /// Removes `conn` from `room`. Returns whether it was a member.
    pub fn leave(&self, room: &RoomName, conn: ConnectionId) -> bool {
        let removed = match self.rooms.get_mut(room) {
            Some(mut members) => members.remove(&conn),
            None => false,
        };
        self.rooms.remove_if(room, |_, members| members.is_empty());

        if removed {
            if let Some(mut rooms) = self.joined.get_mut(&conn) {
                rooms.remove(room);
            }
            self.joined.remove_if(&conn, |_, rooms| rooms.is_empty());
        }
        removed
    }

    /// Removes `conn` from every room. Returns the rooms it left.
    pub fn leave_all(&self, conn: ConnectionId) -> Vec<RoomName> {
        let Some((_, rooms)) = self.joined.remove(&conn) else {
            return Vec::new();
        };
        for room in &rooms {
            if let Some(mut members) = self.rooms.get_mut(room) {
                members.remove(&conn);
            }
            self.rooms.remove_if(room, |_, members| members.is_empty());
        }
        rooms.into_iter().collect()
    }

    /// Connections currently in `room`.
    pub fn members(&self, room: &RoomName) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of rooms `conn` has joined.
    pub fn joined_count(&self, conn: ConnectionId) -> usize {
        self.joined.get(&conn).map(|rooms| rooms.len()).unwrap_or(0)
    }

    /// Whether `conn` is in `room`.
    pub fn is_member(&self, room: &RoomName, conn: ConnectionId) -> bool {
        self.rooms
            .get(room)
            .is_some_and(|members| members.contains(&conn))
    }

    /// Number of non-empty rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
