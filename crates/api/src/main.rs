use std::sync::Arc;
use std::time::Duration;

use lingualink_api::{
    build_router,
    state::AppState,
    ws::{dispatcher::WsEventSink, storage::WsStorage},
};
use lingualink_config::Settings;
use lingualink_services::{
    MatchmakingQueue, NullDirectory, RoomRegistry, SessionIndex, SessionLifecycle,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load()?;

    let registry = Arc::new(RoomRegistry::new(Duration::from_secs(settings.rooms.ttl_secs)));
    let queue = Arc::new(MatchmakingQueue::new(
        settings.matchmaking.complementary.clone(),
    ));
    let index = Arc::new(SessionIndex::new());
    let ws_storage = Arc::new(WsStorage::new());
    let sink = Arc::new(WsEventSink::new(Arc::clone(&ws_storage)));

    let lifecycle = Arc::new(SessionLifecycle::new(
        Arc::clone(&registry),
        queue,
        index,
        Arc::new(NullDirectory),
        sink,
        settings.matchmaking.supported_languages.clone(),
        Duration::from_secs(settings.matchmaking.timeout_secs),
    ));

    let _sweeper =
        registry.spawn_ttl_sweeper(Duration::from_secs(settings.rooms.sweep_interval_secs));

    let state = AppState {
        lifecycle,
        ws_storage,
    };
    let app = build_router(state);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "Signaling server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
