use std::sync::Arc;

use lingualink_services::SessionLifecycle;

use crate::ws::storage::WsStorage;

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<SessionLifecycle>,
    pub ws_storage: Arc<WsStorage>,
}
