use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::model::RoomStatus;

/// Client → server intents, `{ "type": ..., "data": ... }` on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientIntent {
    Ping,
    JoinRoom {
        user_id: String,
        #[serde(default)]
        room_id: Option<Uuid>,
        language: String,
        #[serde(default)]
        device_info: Option<String>,
    },
    LeaveRoom {
        room_id: Uuid,
    },
    StartCall {
        caller_id: String,
        target_user_id: String,
    },
    FindMatch {
        user_id: String,
        language: String,
        #[serde(default)]
        preferred_language: Option<String>,
    },
    CancelMatch {},
    Offer {
        room_id: Uuid,
        #[serde(default)]
        target_user_id: Option<String>,
        payload: Value,
    },
    Answer {
        room_id: Uuid,
        #[serde(default)]
        target_user_id: Option<String>,
        payload: Value,
    },
    IceCandidate {
        room_id: Uuid,
        #[serde(default)]
        target_user_id: Option<String>,
        payload: Value,
    },
}

/// Server → client events, mirrored envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Connected {
        connection_id: Uuid,
    },
    Pong,
    RoomJoined {
        room_id: Uuid,
        participants: Vec<ParticipantInfo>,
        status: RoomStatus,
    },
    UserJoined {
        room_id: Uuid,
        user_id: String,
        language: String,
    },
    RoomLeft {
        room_id: Uuid,
    },
    UserLeft {
        room_id: Uuid,
        user_id: String,
    },
    CallInitiated {
        room_id: Uuid,
    },
    IncomingCall {
        room_id: Uuid,
        caller: CallerInfo,
    },
    MatchmakingStarted {
        language: String,
        preferred_language: String,
    },
    MatchFound {
        room_id: Uuid,
        other_user: ParticipantInfo,
    },
    MatchmakingTimeout,
    MatchmakingCancelled,
    Offer {
        room_id: Uuid,
        from_user_id: String,
        payload: Value,
    },
    Answer {
        room_id: Uuid,
        from_user_id: String,
        payload: Value,
    },
    IceCandidate {
        room_id: Uuid,
        from_user_id: String,
        payload: Value,
    },
    Error {
        code: ErrorCode,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticipantInfo {
    pub user_id: String,
    pub language: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallerInfo {
    pub user_id: String,
    pub display_name: String,
}

/// The three symmetric signaling message kinds the relay forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

impl SignalKind {
    pub fn into_event(self, room_id: Uuid, from_user_id: String, payload: Value) -> ServerEvent {
        match self {
            SignalKind::Offer => ServerEvent::Offer {
                room_id,
                from_user_id,
                payload,
            },
            SignalKind::Answer => ServerEvent::Answer {
                room_id,
                from_user_id,
                payload,
            },
            SignalKind::IceCandidate => ServerEvent::IceCandidate {
                room_id,
                from_user_id,
                payload,
            },
        }
    }
}
