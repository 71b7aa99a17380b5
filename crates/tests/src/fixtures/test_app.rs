use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use lingualink_api::{
    build_router,
    state::AppState,
    ws::{dispatcher::WsEventSink, storage::WsStorage},
};
use lingualink_config::Settings;
use lingualink_services::{
    MatchmakingQueue, NullDirectory, RoomRegistry, SessionIndex, SessionLifecycle,
};

/// Full server on an ephemeral port, wired exactly like the binary.
pub struct TestApp {
    pub addr: String,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let settings = Settings::default();

        let registry = Arc::new(RoomRegistry::new(Duration::from_secs(
            settings.rooms.ttl_secs,
        )));
        let queue = Arc::new(MatchmakingQueue::new(
            settings.matchmaking.complementary.clone(),
        ));
        let index = Arc::new(SessionIndex::new());
        let ws_storage = Arc::new(WsStorage::new());
        let sink = Arc::new(WsEventSink::new(Arc::clone(&ws_storage)));
        let lifecycle = Arc::new(SessionLifecycle::new(
            registry,
            queue,
            index,
            Arc::new(NullDirectory),
            sink,
            settings.matchmaking.supported_languages.clone(),
            Duration::from_secs(settings.matchmaking.timeout_secs),
        ));

        let app = build_router(AppState {
            lifecycle,
            ws_storage,
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("127.0.0.1:{}", listener.local_addr().unwrap().port());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: reqwest::Client::new(),
        }
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("http://{}{}", self.addr, path))
            .send()
            .await
            .unwrap()
    }

    pub async fn stats(&self) -> Value {
        self.get("/api/stats").await.json().await.unwrap()
    }

    /// Opens a WebSocket client and consumes the greeting.
    pub async fn ws(&self) -> WsClient {
        let (stream, _) = connect_async(format!("ws://{}/ws", self.addr))
            .await
            .unwrap();
        let mut client = WsClient {
            stream,
            connection_id: String::new(),
        };
        let connected = client.recv_event().await;
        assert_eq!(connected["type"], "connected");
        client.connection_id = connected["data"]["connection_id"]
            .as_str()
            .unwrap()
            .to_string();
        client
    }
}

pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    pub connection_id: String,
}

impl WsClient {
    pub async fn send(&mut self, intent: Value) {
        self.stream
            .send(Message::Text(intent.to_string().into()))
            .await
            .unwrap();
    }

    /// Next JSON event, skipping transport frames.
    pub async fn recv_event(&mut self) -> Value {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), self.stream.next())
                .await
                .expect("timed out waiting for server event")
                .expect("websocket closed")
                .unwrap();
            if let Message::Text(text) = msg {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    /// Next event, asserting its type.
    pub async fn expect_event(&mut self, event_type: &str) -> Value {
        let event = self.recv_event().await;
        assert_eq!(event["type"], event_type, "unexpected event: {event}");
        event
    }

    /// Asserts nothing is pending by bouncing a ping off the server.
    pub async fn expect_silence(&mut self) {
        self.send(serde_json::json!({ "type": "ping" })).await;
        self.expect_event("pong").await;
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}
