//! Connection handle, per-connection session and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::websocket::OutboundMessage;

/// Room identifier, compared by value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Shared, immutable side of a WebSocket connection.
///
/// This is what the registries hold and what other connections use to reach
/// this one. Identity and room live in the owning task's [`Session`].
#[derive(Debug)]
pub struct ConnectionHandle {
    pub id: Uuid,
    sender: mpsc::UnboundedSender<OutboundMessage>,
    pub connected_at: DateTime<Utc>,
    initialized: AtomicBool,
}

impl ConnectionHandle {
    pub fn new(sender: mpsc::UnboundedSender<OutboundMessage>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            connected_at: Utc::now(),
            initialized: AtomicBool::new(false),
        }
    }

    /// Queue a message for the writer task. Never blocks.
    pub fn send(
        &self,
        message: impl Into<OutboundMessage>,
    ) -> Result<(), mpsc::error::SendError<OutboundMessage>> {
        self.sender.send(message.into())
    }

    /// True once the transport handshake finished and until the socket closes
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    pub fn mark_closed(&self) {
        self.initialized.store(false, Ordering::Release);
    }
}

/// Protocol state of one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Identified,
    InRoom,
}

/// Per-connection mutable state, owned by the connection's own task
#[derive(Debug)]
pub struct Session {
    handle: Arc<ConnectionHandle>,
    identity: Option<String>,
    room: Option<RoomId>,
}

impl Session {
    pub fn new(handle: Arc<ConnectionHandle>) -> Self {
        Self {
            handle,
            identity: None,
            room: None,
        }
    }

    pub fn handle(&self) -> &Arc<ConnectionHandle> {
        &self.handle
    }

    pub fn id(&self) -> Uuid {
        self.handle.id
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn room(&self) -> Option<&RoomId> {
        self.room.as_ref()
    }

    pub fn state(&self) -> SessionState {
        match (&self.identity, &self.room) {
            (None, _) => SessionState::Anonymous,
            (Some(_), None) => SessionState::Identified,
            (Some(_), Some(_)) => SessionState::InRoom,
        }
    }

    pub(crate) fn set_identity(&mut self, name: String) {
        self.identity = Some(name);
    }

    pub(crate) fn enter_room(&mut self, room: RoomId) {
        self.room = Some(room);
    }

    pub(crate) fn take_room(&mut self) -> Option<RoomId> {
        self.room.take()
    }

    pub(crate) fn take_identity(&mut self) -> Option<String> {
        self.identity.take()
    }
}

/// Registry conflicts and misses
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("name '{0}' is already taken")]
    NameTaken(String),

    #[error("room '{0}' already exists")]
    RoomExists(RoomId),

    #[error("room '{0}' does not exist")]
    RoomNotFound(RoomId),

    #[error("connection is already a member of room '{0}'")]
    AlreadyMember(RoomId),
}
