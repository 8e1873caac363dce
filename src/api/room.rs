use crate::room::MetricsSnapshot;
use crate::state::{Position, SyncCore};
use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;
use std::sync::Arc;

/// Shared state for the room status API
pub struct RoomAppState {
    pub core: Arc<SyncCore>,
}

/// Room status response
#[derive(Serialize)]
pub struct RoomStatusResponse {
    pub room: String,
    pub sessions: usize,
    pub units: Vec<Position>,
    pub metrics: MetricsSnapshot,
    #[serde(rename = "lastMoveAt")]
    pub last_move_at: Option<String>,
}

/// Create room status router
pub fn create_room_router(state: Arc<RoomAppState>) -> Router {
    Router::new()
        .route("/api/room", get(get_room))
        .with_state(state)
}

/// GET /api/room - Current sessions, unit table and counters
async fn get_room(State(state): State<Arc<RoomAppState>>) -> Json<RoomStatusResponse> {
    let core = &state.core;

    Json(RoomStatusResponse {
        room: core.room_name().to_string(),
        sessions: core.registry().len(),
        units: core.snapshot(),
        metrics: core.metrics().get_snapshot(),
        last_move_at: core.last_move_at().map(|t| t.to_rfc3339()),
    })
}
