//! Registry statistics and room info structures

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::rooms::Member;
use super::types::RoomId;

/// One member of a room as reported by the API
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberInfo {
    pub name: String,
    pub connected_at: DateTime<Utc>,
}

/// Snapshot of one room
#[derive(Debug, Clone, Serialize)]
pub struct RoomInfo {
    pub id: RoomId,
    pub member_count: usize,
    pub members: Vec<MemberInfo>,
}

impl RoomInfo {
    pub(crate) fn new(id: &RoomId, members: &[Member]) -> Self {
        Self {
            id: id.clone(),
            member_count: members.len(),
            members: members
                .iter()
                .map(|m| MemberInfo {
                    name: m.name.clone(),
                    connected_at: m.handle.connected_at,
                })
                .collect(),
        }
    }

    /// Member names in join order
    pub fn member_names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.name.as_str()).collect()
    }
}

/// Registry-wide statistics
#[derive(Debug, Clone, Serialize)]
pub struct RegistryStats {
    pub identities: usize,
    pub rooms: usize,
    pub room_members: usize,
}
