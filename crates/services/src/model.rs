use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One call session holding at most two participants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub room_id: Uuid,
    pub participants: Vec<Participant>,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every write; the TTL sweeper reclaims stale rooms.
    pub touched_at: DateTime<Utc>,
}

impl Room {
    pub const MAX_PARTICIPANTS: usize = 2;

    pub fn new(room_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            room_id,
            participants: Vec::new(),
            status: RoomStatus::Waiting,
            created_at: now,
            touched_at: now,
        }
    }

    pub fn participant(&self, user_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= Self::MAX_PARTICIPANTS
    }

    /// Connection ids of every participant except `connection_id`.
    pub fn other_connection_ids(&self, connection_id: Uuid) -> Vec<Uuid> {
        self.participants
            .iter()
            .filter(|p| p.connection_id != connection_id)
            .map(|p| p.connection_id)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Active,
    Ended,
}

/// A user's presence inside a room. Owned by the room; `connection_id` is a
/// weak reference into the transport layer, refreshed on reconnect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: String,
    pub connection_id: Uuid,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_info: Option<String>,
}

/// A user waiting in the matchmaking queue for their language.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub user_id: String,
    pub connection_id: Uuid,
    pub language: String,
    pub enqueued_at: DateTime<Utc>,
}
