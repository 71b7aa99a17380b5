use dashmap::DashMap;
use uuid::Uuid;

/// Bidirectional lookup between live connections, users, and rooms.
///
/// Three maps that must stay consistent: every non-expired mapping has a
/// reverse mapping, and connection cleanup removes all of them through the
/// single `remove_connection` routine (used by both explicit-leave-then-close
/// and transport disconnect).
pub struct SessionIndex {
    conn_to_user: DashMap<Uuid, String>,
    user_to_conn: DashMap<String, Uuid>,
    user_to_room: DashMap<String, Uuid>,
}

impl SessionIndex {
    pub fn new() -> Self {
        Self {
            conn_to_user: DashMap::new(),
            user_to_conn: DashMap::new(),
            user_to_room: DashMap::new(),
        }
    }

    /// Binds a connection to a user identity. A reconnect replaces the stale
    /// connection mapping instead of leaving it dangling.
    pub fn bind(&self, connection_id: Uuid, user_id: &str) {
        if let Some(old_conn) = self.user_to_conn.insert(user_id.to_string(), connection_id)
            && old_conn != connection_id
        {
            self.conn_to_user.remove(&old_conn);
        }
        self.conn_to_user.insert(connection_id, user_id.to_string());
    }

    pub fn set_room(&self, user_id: &str, room_id: Uuid) {
        self.user_to_room.insert(user_id.to_string(), room_id);
    }

    pub fn clear_room(&self, user_id: &str) -> Option<Uuid> {
        self.user_to_room.remove(user_id).map(|(_, room)| room)
    }

    pub fn user_of(&self, connection_id: Uuid) -> Option<String> {
        self.conn_to_user.get(&connection_id).map(|u| u.clone())
    }

    pub fn connection_of(&self, user_id: &str) -> Option<Uuid> {
        self.user_to_conn.get(user_id).map(|c| *c)
    }

    pub fn room_of(&self, user_id: &str) -> Option<Uuid> {
        self.user_to_room.get(user_id).map(|r| *r)
    }

    /// Removes everything known about a connection in one pass. Returns the
    /// user and their room mapping, if any. Idempotent: a second call for the
    /// same connection returns `None`.
    pub fn remove_connection(&self, connection_id: Uuid) -> Option<(String, Option<Uuid>)> {
        let (_, user_id) = self.conn_to_user.remove(&connection_id)?;
        // Only drop the reverse mapping if it still points at this
        // connection; a reconnect may have rebound the user already.
        self.user_to_conn
            .remove_if(&user_id, |_, conn| *conn == connection_id);
        let room_id = self.user_to_room.remove(&user_id).map(|(_, r)| r);
        Some((user_id, room_id))
    }
}

impl Default for SessionIndex {
    fn default() -> Self {
        Self::new()
    }
}
