use async_trait::async_trait;
use axum::extract::ws::Message;
use futures::SinkExt;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use lingualink_services::{EventSink, ServerEvent};

use super::storage::WsStorage;

/// Sends one server event to a single connection. A connection that is gone
/// by the time the send happens is not an error, the disconnect path cleans
/// it up.
pub async fn send_to_connection(ws_storage: &WsStorage, connection_id: Uuid, event: &ServerEvent) {
    let Some(sender) = ws_storage.get(connection_id) else {
        debug!(%connection_id, "Dropping event for closed connection");
        return;
    };
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            warn!(%connection_id, %e, "Failed to serialize server event");
            return;
        }
    };
    let mut guard = sender.lock().await;
    if let Err(e) = guard.send(Message::text(text)).await {
        warn!(%connection_id, %e, "Failed to send WS message");
    }
}

/// Delivery seam backed by the live connection map.
pub struct WsEventSink {
    ws_storage: Arc<WsStorage>,
}

impl WsEventSink {
    pub fn new(ws_storage: Arc<WsStorage>) -> Self {
        Self { ws_storage }
    }
}

#[async_trait]
impl EventSink for WsEventSink {
    async fn deliver(&self, connection_id: Uuid, event: &ServerEvent) {
        send_to_connection(&self.ws_storage, connection_id, event).await;
    }
}
