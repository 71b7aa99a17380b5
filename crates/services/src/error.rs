use serde::Serialize;

/// Failures produced by the session services.
///
/// Validation, not-found, capacity, and offline errors are reported to the
/// originating connection and never retried; internal errors are logged with
/// context and surfaced as a generic failure.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("room not found")]
    RoomNotFound,
    #[error("room is full")]
    RoomFull,
    #[error("user has no live connection")]
    UserOffline,
    #[error("invalid intent: {0}")]
    InvalidData(String),
    #[error("matchmaking failed: {0}")]
    MatchmakingFailed(String),
    #[error("signaling failed: {0}")]
    SignalingFailed(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Wire-level error codes carried in `error` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RoomNotFound,
    RoomFull,
    UserNotFound,
    InvalidData,
    MatchmakingFailed,
    SignalingFailed,
    InternalError,
}

impl ServiceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::RoomNotFound => ErrorCode::RoomNotFound,
            ServiceError::RoomFull => ErrorCode::RoomFull,
            ServiceError::UserOffline => ErrorCode::UserNotFound,
            ServiceError::InvalidData(_) => ErrorCode::InvalidData,
            ServiceError::MatchmakingFailed(_) => ErrorCode::MatchmakingFailed,
            ServiceError::SignalingFailed(_) => ErrorCode::SignalingFailed,
            ServiceError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Message safe to show to the client. Internal detail stays in the logs.
    pub fn client_message(&self) -> String {
        match self {
            ServiceError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}
