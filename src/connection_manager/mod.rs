//! Live connection bookkeeping: who is logged in under which name, and which
//! connections share a room.

mod registry;
mod rooms;
mod stats;
mod types;

pub use registry::ClientRegistry;
pub use rooms::{Member, RoomRegistry};
pub use stats::{MemberInfo, RegistryStats, RoomInfo};
pub use types::{ConnectionHandle, RegistryError, RoomId, Session, SessionState};
