use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ServiceError;
use crate::model::{Participant, Room, RoomStatus};

/// Outcome of adding a participant to a room.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub room: Room,
    /// True exactly when this add made the 2nd distinct participant,
    /// i.e. the room transitioned Waiting → Active.
    pub became_active: bool,
}

/// Authoritative store of call rooms and participant membership.
///
/// Every mutation runs under the DashMap entry lock for that room id, so a
/// read-modify-write (e.g. two users racing to join the same room) can never
/// interleave with another writer.
pub struct RoomRegistry {
    rooms: DashMap<Uuid, Room>,
    ttl: Duration,
}

impl RoomRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            rooms: DashMap::new(),
            ttl,
        }
    }

    /// Allocates a new room in `waiting` state. Always succeeds.
    pub fn create_room(&self) -> Room {
        let room = Room::new(Uuid::new_v4());
        self.rooms.insert(room.room_id, room.clone());
        debug!(room_id = %room.room_id, "Room created");
        room
    }

    pub fn get_room(&self, room_id: Uuid) -> Option<Room> {
        self.rooms.get(&room_id).map(|r| r.clone())
    }

    pub fn is_full(&self, room_id: Uuid) -> bool {
        self.rooms
            .get(&room_id)
            .map(|r| r.is_full())
            .unwrap_or(false)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn active_room_count(&self) -> usize {
        self.rooms
            .iter()
            .filter(|r| r.status == RoomStatus::Active)
            .count()
    }

    /// Adds a participant, or refreshes the connection id if the user is
    /// already a member (reconnect). Transitions to `active` exactly when the
    /// 2nd distinct participant arrives.
    pub fn add_participant(
        &self,
        room_id: Uuid,
        participant: Participant,
    ) -> Result<JoinOutcome, ServiceError> {
        let mut room = self
            .rooms
            .get_mut(&room_id)
            .ok_or(ServiceError::RoomNotFound)?;

        if room.status == RoomStatus::Ended {
            return Err(ServiceError::RoomNotFound);
        }

        room.touched_at = Utc::now();

        if let Some(existing) = room
            .participants
            .iter_mut()
            .find(|p| p.user_id == participant.user_id)
        {
            // Reconnect: refresh the transport reference in place.
            existing.connection_id = participant.connection_id;
            existing.device_info = participant.device_info;
            return Ok(JoinOutcome {
                room: room.clone(),
                became_active: false,
            });
        }

        if room.is_full() {
            return Err(ServiceError::RoomFull);
        }

        room.participants.push(participant);
        let became_active = room.participants.len() == Room::MAX_PARTICIPANTS;
        if became_active {
            room.status = RoomStatus::Active;
            info!(room_id = %room_id, "Room active");
        }

        Ok(JoinOutcome {
            room: room.clone(),
            became_active,
        })
    }

    /// Removes a participant. Returns the updated room, or `None` when the
    /// room became empty and was deleted or never existed. Removal is
    /// idempotent, so a disconnect racing a leave is harmless.
    pub fn remove_participant(&self, room_id: Uuid, user_id: &str) -> Option<Room> {
        let delete = {
            let mut room = self.rooms.get_mut(&room_id)?;
            let before = room.participants.len();
            room.participants.retain(|p| p.user_id != user_id);
            let removed = room.participants.len() < before;
            room.touched_at = Utc::now();
            if room.participants.is_empty() {
                room.status = RoomStatus::Ended;
                true
            } else {
                if removed {
                    room.status = RoomStatus::Waiting;
                }
                false
            }
        };

        if delete {
            self.rooms.remove(&room_id);
            debug!(room_id = %room_id, "Room deleted (empty)");
            None
        } else {
            self.get_room(room_id)
        }
    }

    /// Drops rooms whose TTL elapsed without a write. Returns how many were
    /// reclaimed.
    pub fn sweep_expired(&self) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::hours(1));
        let stale: Vec<Uuid> = self
            .rooms
            .iter()
            .filter(|r| r.touched_at < cutoff || r.status == RoomStatus::Ended)
            .map(|r| r.room_id)
            .collect();

        let count = stale.len();
        for room_id in stale {
            self.rooms.remove(&room_id);
            info!(%room_id, "Room expired via TTL sweep");
        }
        count
    }

    /// Spawns the background TTL sweeper. The returned handle aborts it.
    pub fn spawn_ttl_sweeper(
        self: &Arc<Self>,
        interval: Duration,
    ) -> tokio::task::AbortHandle {
        let registry = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let swept = registry.sweep_expired();
                if swept > 0 {
                    debug!(swept, "TTL sweep reclaimed rooms");
                }
            }
        });
        handle.abort_handle()
    }
}
