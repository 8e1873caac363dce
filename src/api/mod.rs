// HTTP and WebSocket APIs

pub mod room;
pub mod websocket;

pub use room::{create_room_router, RoomAppState};
pub use websocket::{create_ws_router, ws_handler, WsAppState};

use crate::config::SessionConfig;
use crate::state::SyncCore;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Full application router: WebSocket endpoint plus status API
pub fn create_app(core: Arc<SyncCore>, session: &SessionConfig) -> Router {
    let ws_state = Arc::new(WsAppState {
        core: Arc::clone(&core),
        outbound_buffer: session.outbound_buffer,
    });
    let room_state = Arc::new(RoomAppState { core });

    Router::new()
        .merge(create_ws_router(ws_state))
        .merge(create_room_router(room_state))
        .layer(CorsLayer::permissive())
}
