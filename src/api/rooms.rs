//! Room inspection endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::connection_manager::{RoomId, RoomInfo};
use crate::error::{AppError, Result};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct RoomListResponse {
    pub rooms: Vec<RoomInfo>,
    pub total_rooms: usize,
}

/// GET /api/v1/rooms - List all rooms with their members
pub async fn list_rooms(State(state): State<AppState>) -> Json<RoomListResponse> {
    let rooms = state.rooms.list();
    let total = rooms.len();

    Json(RoomListResponse {
        rooms,
        total_rooms: total,
    })
}

/// GET /api/v1/rooms/{id} - Get one room
pub async fn get_room(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RoomInfo>> {
    state
        .rooms
        .room_info(&RoomId(id.clone()))
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Room '{}' not found", id)))
}
