use axum::extract::ws::{Message, WebSocket};
use dashmap::DashMap;
use futures::stream::SplitSink;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

pub type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Tracks the write half of every live WebSocket connection. Which user a
/// connection belongs to is the session index's concern, not this map's.
pub struct WsStorage {
    connections: DashMap<Uuid, WsSender>,
}

impl WsStorage {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    pub fn add(&self, connection_id: Uuid, sender: WsSender) {
        self.connections.insert(connection_id, sender);
    }

    pub fn remove(&self, connection_id: Uuid) {
        self.connections.remove(&connection_id);
    }

    pub fn get(&self, connection_id: Uuid) -> Option<WsSender> {
        self.connections
            .get(&connection_id)
            .map(|entry| entry.value().clone())
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for WsStorage {
    fn default() -> Self {
        Self::new()
    }
}
