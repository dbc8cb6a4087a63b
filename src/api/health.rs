//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::connection_manager::RegistryStats;
use crate::server::AppState;
use crate::signaling::RouterStatsSnapshot;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub registry: RegistryStats,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub registry: RegistryStats,
    pub identities: Vec<String>,
    pub rooms: std::collections::BTreeMap<String, usize>,
    pub messages: RouterStatsSnapshot,
}

fn registry_stats(state: &AppState) -> RegistryStats {
    let rooms = state.rooms.list();
    RegistryStats {
        identities: state.clients.len(),
        rooms: rooms.len(),
        room_members: rooms.iter().map(|r| r.member_count).sum(),
    }
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        registry: registry_stats(&state),
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let rooms = state
        .rooms
        .list()
        .into_iter()
        .map(|room| (room.id.0, room.member_count))
        .collect();

    Json(StatsResponse {
        registry: registry_stats(&state),
        identities: state.clients.names(),
        rooms,
        messages: state.router.stats(),
    })
}
