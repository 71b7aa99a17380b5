use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::registry::RoomRegistry;

/// Forwards WebRTC negotiation messages between paired peers.
///
/// Delivery is fire-and-forget: no acknowledgement, no retry. The negotiation
/// layer above tolerates lost or duplicate signaling messages, so a stale
/// target (peer reconnected mid-negotiation) is silently dropped.
pub struct SignalingRelay {
    registry: Arc<RoomRegistry>,
}

impl SignalingRelay {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    /// Resolves the connection ids a signaling message should be forwarded
    /// to. With a target user: that participant's current connection, or
    /// nobody if the target is not in the room. Without: every participant
    /// except the sender's connection.
    pub fn recipients(
        &self,
        room_id: Uuid,
        sender_connection: Uuid,
        target_user_id: Option<&str>,
    ) -> Result<Vec<Uuid>, ServiceError> {
        let room = self
            .registry
            .get_room(room_id)
            .ok_or(ServiceError::RoomNotFound)?;

        match target_user_id {
            Some(target) => match room.participant(target) {
                Some(p) => Ok(vec![p.connection_id]),
                None => {
                    debug!(%room_id, target, "Signaling target not in room, dropping");
                    Ok(Vec::new())
                }
            },
            None => Ok(room.other_connection_ids(sender_connection)),
        }
    }
}
