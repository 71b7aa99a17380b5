use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use lingualink_services::{ClientIntent, ErrorCode, ServerEvent};

use crate::state::AppState;

pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    info!(%connection_id, "WebSocket connected");

    let (sender, mut receiver) = socket.split();
    let sender = Arc::new(Mutex::new(sender));

    state.ws_storage.add(connection_id, sender.clone());

    super::dispatcher::send_to_connection(
        &state.ws_storage,
        connection_id,
        &ServerEvent::Connected { connection_id },
    )
    .await;

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_client_message(&state, connection_id, &text).await;
            }
            Ok(Message::Ping(data)) => {
                let mut guard = sender.lock().await;
                let _ = guard.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) => {
                break;
            }
            Err(e) => {
                warn!(%connection_id, %e, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    // Cleanup: the lifecycle seats the peer notifications, the storage just
    // forgets the socket.
    state.lifecycle.disconnect(connection_id).await;
    state.ws_storage.remove(connection_id);

    info!(%connection_id, "WebSocket disconnected");
}

async fn handle_client_message(state: &AppState, connection_id: Uuid, text: &str) {
    let intent: ClientIntent = match serde_json::from_str(text) {
        Ok(intent) => intent,
        Err(e) => {
            debug!(%connection_id, %e, "Unparseable client message");
            super::dispatcher::send_to_connection(
                &state.ws_storage,
                connection_id,
                &ServerEvent::Error {
                    code: ErrorCode::InvalidData,
                    message: format!("invalid message: {e}"),
                    details: None,
                },
            )
            .await;
            return;
        }
    };

    state.lifecycle.handle_intent(connection_id, intent).await;
}
