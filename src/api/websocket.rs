use crate::connection::ConnectionManager;
use crate::state::SyncCore;
use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Response,
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::info;

/// Shared application state for WebSocket handler
#[derive(Clone)]
pub struct WsAppState {
    pub core: Arc<SyncCore>,
    pub outbound_buffer: usize,
}

/// GET /ws/game/ - WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<WsAppState>>) -> Response {
    info!(room = %state.core.room_name(), "WebSocket upgrade request received");
    ws.on_upgrade(move |socket| {
        ConnectionManager::new(Arc::clone(&state.core), state.outbound_buffer).handle(socket)
    })
}

/// Create WebSocket router
pub fn create_ws_router(state: Arc<WsAppState>) -> Router {
    Router::new()
        .route("/ws/game", get(ws_handler))
        .route("/ws/game/", get(ws_handler))
        .with_state(state)
}
