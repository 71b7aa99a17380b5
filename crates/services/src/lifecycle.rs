use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::directory::UserDirectory;
use crate::error::ServiceError;
use crate::events::{CallerInfo, ClientIntent, ParticipantInfo, ServerEvent, SignalKind};
use crate::matchmaking::{self, MatchAttempt, MatchmakingQueue};
use crate::model::{Participant, QueueEntry, Room};
use crate::registry::RoomRegistry;
use crate::relay::SignalingRelay;
use crate::session::SessionIndex;

/// Outbound event delivery seam. Implemented over the WebSocket dispatcher
/// in production and over a recording channel in tests.
#[async_trait]
pub trait EventSink: Send + Sync + 'static {
    async fn deliver(&self, connection_id: Uuid, event: &ServerEvent);
}

/// Observability snapshot exposed via the stats route.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub rooms: usize,
    pub active_rooms: usize,
    pub queued_users: usize,
    pub completed_calls: u64,
}

/// Connects client intents to the registry, matchmaking queue, and relay.
/// Owns join/leave/disconnect semantics and the session index.
///
/// Per-connection state machine: disconnected → joining → in-room(waiting)
/// → in-room(active) → leaving → disconnected. Every failure is reported to
/// the originating connection as a structured error; shared state is only
/// mutated through per-key atomic operations, so a failed intent leaves it
/// unchanged.
pub struct SessionLifecycle {
    registry: Arc<RoomRegistry>,
    queue: Arc<MatchmakingQueue>,
    relay: SignalingRelay,
    index: Arc<SessionIndex>,
    directory: Arc<dyn UserDirectory>,
    sink: Arc<dyn EventSink>,
    supported_languages: Vec<String>,
    match_timeout: Duration,
    completed_calls: AtomicU64,
}

impl SessionLifecycle {
    pub fn new(
        registry: Arc<RoomRegistry>,
        queue: Arc<MatchmakingQueue>,
        index: Arc<SessionIndex>,
        directory: Arc<dyn UserDirectory>,
        sink: Arc<dyn EventSink>,
        supported_languages: Vec<String>,
        match_timeout: Duration,
    ) -> Self {
        let relay = SignalingRelay::new(Arc::clone(&registry));
        Self {
            registry,
            queue,
            relay,
            index,
            directory,
            sink,
            supported_languages,
            match_timeout,
            completed_calls: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            rooms: self.registry.room_count(),
            active_rooms: self.registry.active_room_count(),
            queued_users: self.queue.total_queued(),
            completed_calls: self.completed_calls.load(Ordering::Relaxed),
        }
    }

    /// Dispatches one client intent. Errors never propagate past here: they
    /// are reported to the originating connection and the session survives.
    pub async fn handle_intent(self: &Arc<Self>, connection_id: Uuid, intent: ClientIntent) {
        let result = match intent {
            ClientIntent::Ping => {
                self.sink.deliver(connection_id, &ServerEvent::Pong).await;
                Ok(())
            }
            ClientIntent::JoinRoom {
                user_id,
                room_id,
                language,
                device_info,
            } => {
                self.join_room(connection_id, user_id, room_id, language, device_info)
                    .await
            }
            ClientIntent::LeaveRoom { room_id } => self.leave_room(connection_id, room_id).await,
            ClientIntent::StartCall {
                caller_id,
                target_user_id,
            } => {
                self.start_call(connection_id, caller_id, target_user_id)
                    .await
            }
            ClientIntent::FindMatch {
                user_id,
                language,
                preferred_language,
            } => {
                self.find_match(connection_id, user_id, language, preferred_language)
                    .await
            }
            ClientIntent::CancelMatch {} => self.cancel_match(connection_id).await,
            ClientIntent::Offer {
                room_id,
                target_user_id,
                payload,
            } => {
                self.relay_signal(connection_id, SignalKind::Offer, room_id, target_user_id, payload)
                    .await
            }
            ClientIntent::Answer {
                room_id,
                target_user_id,
                payload,
            } => {
                self.relay_signal(
                    connection_id,
                    SignalKind::Answer,
                    room_id,
                    target_user_id,
                    payload,
                )
                .await
            }
            ClientIntent::IceCandidate {
                room_id,
                target_user_id,
                payload,
            } => {
                self.relay_signal(
                    connection_id,
                    SignalKind::IceCandidate,
                    room_id,
                    target_user_id,
                    payload,
                )
                .await
            }
        };

        if let Err(err) = result {
            if matches!(err, ServiceError::Internal(_)) {
                warn!(%connection_id, %err, "Intent failed with internal error");
            } else {
                debug!(%connection_id, %err, "Intent rejected");
            }
            self.sink
                .deliver(
                    connection_id,
                    &ServerEvent::Error {
                        code: err.code(),
                        message: err.client_message(),
                        details: None,
                    },
                )
                .await;
        }
    }

    fn validate_language(&self, language: &str) -> Result<(), ServiceError> {
        if self.supported_languages.iter().any(|l| l == language) {
            Ok(())
        } else {
            Err(ServiceError::InvalidData(format!(
                "unsupported language '{language}'"
            )))
        }
    }

    fn participant_infos(room: &Room) -> Vec<ParticipantInfo> {
        room.participants
            .iter()
            .map(|p| ParticipantInfo {
                user_id: p.user_id.clone(),
                language: p.language.clone(),
            })
            .collect()
    }

    async fn join_room(
        &self,
        connection_id: Uuid,
        user_id: String,
        room_id: Option<Uuid>,
        language: String,
        device_info: Option<String>,
    ) -> Result<(), ServiceError> {
        if user_id.trim().is_empty() {
            return Err(ServiceError::InvalidData("user_id is required".into()));
        }
        self.validate_language(&language)?;

        let room_id = match room_id {
            Some(id) => id,
            None => self.registry.create_room().room_id,
        };

        let outcome = self.registry.add_participant(
            room_id,
            Participant {
                user_id: user_id.clone(),
                connection_id,
                language: language.clone(),
                device_info,
            },
        )?;

        self.index.bind(connection_id, &user_id);
        self.index.set_room(&user_id, room_id);

        if outcome.became_active {
            self.completed_calls.fetch_add(1, Ordering::Relaxed);
        }

        info!(%connection_id, %user_id, %room_id, status = ?outcome.room.status, "User joined room");

        self.sink
            .deliver(
                connection_id,
                &ServerEvent::RoomJoined {
                    room_id,
                    participants: Self::participant_infos(&outcome.room),
                    status: outcome.room.status,
                },
            )
            .await;

        let joined = ServerEvent::UserJoined {
            room_id,
            user_id,
            language,
        };
        for other in outcome.room.other_connection_ids(connection_id) {
            self.sink.deliver(other, &joined).await;
        }

        Ok(())
    }

    async fn leave_room(&self, connection_id: Uuid, room_id: Uuid) -> Result<(), ServiceError> {
        let user_id = self
            .index
            .user_of(connection_id)
            .ok_or_else(|| ServiceError::InvalidData("no active session".into()))?;

        if self.registry.get_room(room_id).is_none() {
            return Err(ServiceError::RoomNotFound);
        }

        self.index.clear_room(&user_id);
        let remaining = self.registry.remove_participant(room_id, &user_id);

        info!(%connection_id, %user_id, %room_id, "User left room");

        self.sink
            .deliver(connection_id, &ServerEvent::RoomLeft { room_id })
            .await;

        if let Some(room) = remaining {
            let left = ServerEvent::UserLeft {
                room_id,
                user_id,
            };
            for p in &room.participants {
                self.sink.deliver(p.connection_id, &left).await;
            }
        }

        Ok(())
    }

    /// Transport-initiated cleanup. Idempotent: tolerates a connection that
    /// never joined and a leave that already ran for the same user.
    pub async fn disconnect(&self, connection_id: Uuid) {
        let Some((user_id, room_id)) = self.index.remove_connection(connection_id) else {
            debug!(%connection_id, "Disconnect with no session mapping");
            return;
        };

        self.queue.dequeue_user(&user_id);
        self.queue.cancel_timer(&user_id);

        if let Some(room_id) = room_id
            && let Some(room) = self.registry.remove_participant(room_id, &user_id)
        {
            let left = ServerEvent::UserLeft {
                room_id,
                user_id: user_id.clone(),
            };
            for p in &room.participants {
                self.sink.deliver(p.connection_id, &left).await;
            }
        }

        info!(%connection_id, %user_id, "Session cleaned up on disconnect");
    }

    async fn start_call(
        &self,
        connection_id: Uuid,
        caller_id: String,
        target_user_id: String,
    ) -> Result<(), ServiceError> {
        if caller_id.trim().is_empty() || target_user_id.trim().is_empty() {
            return Err(ServiceError::InvalidData(
                "caller_id and target_user_id are required".into(),
            ));
        }
        if caller_id == target_user_id {
            return Err(ServiceError::InvalidData("cannot call yourself".into()));
        }

        self.index.bind(connection_id, &caller_id);

        let target_conn = self
            .index
            .connection_of(&target_user_id)
            .ok_or(ServiceError::UserOffline)?;

        // Announce only; the callee occupies the room with its own join.
        let room = self.registry.create_room();

        let display_name = self
            .directory
            .display_name(&caller_id)
            .await
            .unwrap_or_else(|| caller_id.clone());

        info!(%connection_id, %caller_id, %target_user_id, room_id = %room.room_id, "Call initiated");

        self.sink
            .deliver(
                target_conn,
                &ServerEvent::IncomingCall {
                    room_id: room.room_id,
                    caller: CallerInfo {
                        user_id: caller_id,
                        display_name,
                    },
                },
            )
            .await;

        self.sink
            .deliver(
                connection_id,
                &ServerEvent::CallInitiated {
                    room_id: room.room_id,
                },
            )
            .await;

        Ok(())
    }

    async fn find_match(
        self: &Arc<Self>,
        connection_id: Uuid,
        user_id: String,
        language: String,
        preferred_language: Option<String>,
    ) -> Result<(), ServiceError> {
        if user_id.trim().is_empty() {
            return Err(ServiceError::InvalidData("user_id is required".into()));
        }
        self.validate_language(&language)?;
        if let Some(preferred) = &preferred_language {
            self.validate_language(preferred)?;
        }

        let preferred = match preferred_language {
            Some(p) => p,
            None => self
                .queue
                .default_preference(&language)
                .map(str::to_string)
                .ok_or_else(|| {
                    ServiceError::MatchmakingFailed(format!(
                        "no complementary language for '{language}'; pass preferred_language"
                    ))
                })?,
        };

        self.index.bind(connection_id, &user_id);

        let entry = matchmaking::entry(&user_id, connection_id, &language);
        match self.queue.match_or_enqueue(entry, &preferred) {
            MatchAttempt::Matched(peer) => {
                self.queue.cancel_timer(&peer.user_id);
                self.pair(connection_id, &user_id, &language, peer).await
            }
            MatchAttempt::Queued => {
                self.schedule_timeout(connection_id, &user_id, &language);
                self.sink
                    .deliver(
                        connection_id,
                        &ServerEvent::MatchmakingStarted {
                            language,
                            preferred_language: preferred,
                        },
                    )
                    .await;
                Ok(())
            }
        }
    }

    /// Creates a room for a matched pair, seats both, and notifies both ends.
    async fn pair(
        &self,
        connection_id: Uuid,
        user_id: &str,
        language: &str,
        peer: QueueEntry,
    ) -> Result<(), ServiceError> {
        let room = self.registry.create_room();
        let room_id = room.room_id;

        self.registry
            .add_participant(
                room_id,
                Participant {
                    user_id: peer.user_id.clone(),
                    connection_id: peer.connection_id,
                    language: peer.language.clone(),
                    device_info: None,
                },
            )
            .map_err(|e| ServiceError::Internal(format!("seating peer: {e}")))?;

        let outcome = self
            .registry
            .add_participant(
                room_id,
                Participant {
                    user_id: user_id.to_string(),
                    connection_id,
                    language: language.to_string(),
                    device_info: None,
                },
            )
            .map_err(|e| ServiceError::Internal(format!("seating caller: {e}")))?;

        self.index.set_room(user_id, room_id);
        self.index.set_room(&peer.user_id, room_id);

        if outcome.became_active {
            self.completed_calls.fetch_add(1, Ordering::Relaxed);
        }

        info!(%room_id, caller = %user_id, peer = %peer.user_id, "Matchmaking paired");

        self.sink
            .deliver(
                connection_id,
                &ServerEvent::MatchFound {
                    room_id,
                    other_user: ParticipantInfo {
                        user_id: peer.user_id.clone(),
                        language: peer.language.clone(),
                    },
                },
            )
            .await;

        self.sink
            .deliver(
                peer.connection_id,
                &ServerEvent::MatchFound {
                    room_id,
                    other_user: ParticipantInfo {
                        user_id: user_id.to_string(),
                        language: language.to_string(),
                    },
                },
            )
            .await;

        Ok(())
    }

    /// Arms the per-request timeout. The timer only fires a notification if
    /// the entry was still queued (match/cancel/disconnect win otherwise).
    fn schedule_timeout(self: &Arc<Self>, connection_id: Uuid, user_id: &str, language: &str) {
        let lifecycle = Arc::clone(self);
        let user = user_id.to_string();
        let lang = language.to_string();
        let timeout = self.match_timeout;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if lifecycle.queue.dequeue(&user, &lang) {
                debug!(user_id = %user, "Matchmaking timed out");
                lifecycle
                    .sink
                    .deliver(connection_id, &ServerEvent::MatchmakingTimeout)
                    .await;
            }
        });

        self.queue.register_timer(user_id, handle.abort_handle());
    }

    async fn cancel_match(&self, connection_id: Uuid) -> Result<(), ServiceError> {
        let user_id = self
            .index
            .user_of(connection_id)
            .ok_or_else(|| ServiceError::InvalidData("no active session".into()))?;

        self.queue.dequeue_user(&user_id);
        self.queue.cancel_timer(&user_id);

        self.sink
            .deliver(connection_id, &ServerEvent::MatchmakingCancelled)
            .await;
        Ok(())
    }

    async fn relay_signal(
        &self,
        connection_id: Uuid,
        kind: SignalKind,
        room_id: Uuid,
        target_user_id: Option<String>,
        payload: Value,
    ) -> Result<(), ServiceError> {
        let from_user_id = self
            .index
            .user_of(connection_id)
            .ok_or_else(|| ServiceError::InvalidData("no active session".into()))?;

        let recipients =
            self.relay
                .recipients(room_id, connection_id, target_user_id.as_deref())?;

        let event = kind.into_event(room_id, from_user_id, payload);
        for recipient in recipients {
            self.sink.deliver(recipient, &event).await;
        }
        Ok(())
    }
}
