use axum::{Json, extract::State};
use serde::Serialize;

use lingualink_services::lifecycle::StatsSnapshot;

use crate::state::AppState;

#[derive(Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub sessions: StatsSnapshot,
    pub connections: usize,
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        sessions: state.lifecycle.stats(),
        connections: state.ws_storage.connection_count(),
    })
}
