use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::connection_manager::{
    ClientRegistry, ConnectionHandle, Member, RoomId, RoomRegistry, Session,
};
use crate::metrics::{ConnectionMetrics, SignalMetrics};
use crate::websocket::{
    decode, ClientMessage, DecodeError, OutboundMessage, ServerMessage,
    ALREADY_IN_ROOM_MESSAGE, CONNECT_FAILURE, CONNECT_SUCCESS, CREATE_ROOM_EXISTS,
    CREATE_SUCCESS, LEAVE_ACK, LOGIN_FAILURE, LOGIN_REQUIRED_MESSAGE, LOGIN_SUCCESS,
    UNRECOGNIZED_COMMAND,
};

/// Statistics for the message router
#[derive(Debug, Default)]
pub struct RouterStats {
    /// Messages that decoded and were dispatched
    pub messages_handled: AtomicU64,
    /// Frames rejected before dispatch (bad JSON, no type, bad fields)
    pub decode_failures: AtomicU64,
    /// Frames with a `type` outside the protocol
    pub unrecognized_commands: AtomicU64,
    /// Offers/answers/candidates queued for their target
    pub relays_delivered: AtomicU64,
    /// Offers/answers/candidates dropped for lack of a live target
    pub relays_dropped: AtomicU64,
}

impl RouterStats {
    pub fn snapshot(&self) -> RouterStatsSnapshot {
        RouterStatsSnapshot {
            messages_handled: self.messages_handled.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            unrecognized_commands: self.unrecognized_commands.load(Ordering::Relaxed),
            relays_delivered: self.relays_delivered.load(Ordering::Relaxed),
            relays_dropped: self.relays_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of router statistics
#[derive(Debug, Clone, Serialize)]
pub struct RouterStatsSnapshot {
    pub messages_handled: u64,
    pub decode_failures: u64,
    pub unrecognized_commands: u64,
    pub relays_delivered: u64,
    pub relays_dropped: u64,
}

/// Routes decoded client messages between connections.
///
/// Every handler is synchronous: it touches the registries, pushes replies
/// onto outbound channels and returns without waiting on any other
/// connection.
pub struct MessageRouter {
    clients: Arc<ClientRegistry>,
    rooms: Arc<RoomRegistry>,
    stats: RouterStats,
}

impl MessageRouter {
    pub fn new(clients: Arc<ClientRegistry>, rooms: Arc<RoomRegistry>) -> Self {
        Self {
            clients,
            rooms,
            stats: RouterStats::default(),
        }
    }

    pub fn clients(&self) -> &Arc<ClientRegistry> {
        &self.clients
    }

    pub fn rooms(&self) -> &Arc<RoomRegistry> {
        &self.rooms
    }

    pub fn stats(&self) -> RouterStatsSnapshot {
        self.stats.snapshot()
    }

    /// A transport session opened: start it anonymous
    pub fn open(&self, handle: Arc<ConnectionHandle>) -> Session {
        handle.mark_initialized();
        tracing::info!(connection_id = %handle.id, "User connected");
        Session::new(handle)
    }

    /// A text frame arrived on `session`
    pub fn on_message(&self, session: &mut Session, text: &str) {
        tracing::debug!(connection_id = %session.id(), payload = %text, "Got message");

        match decode(text) {
            Ok(message) => self.dispatch(session, message),
            Err(DecodeError::UnknownType(kind)) => {
                tracing::warn!(connection_id = %session.id(), message_type = %kind, "Unrecognized command");
                self.stats.unrecognized_commands.fetch_add(1, Ordering::Relaxed);
                SignalMetrics::record_decode_failure("unknown_type");
                deliver(session.handle(), UNRECOGNIZED_COMMAND.clone());
            }
            Err(e) => {
                let reason = match &e {
                    DecodeError::Malformed(_) => "malformed",
                    DecodeError::MissingType => "missing_type",
                    DecodeError::InvalidFields { .. } => "invalid_fields",
                    DecodeError::UnknownType(_) => "unknown_type",
                };
                tracing::warn!(connection_id = %session.id(), error = %e, "Failed to decode message");
                self.stats.decode_failures.fetch_add(1, Ordering::Relaxed);
                SignalMetrics::record_decode_failure(reason);
            }
        }
    }

    /// The transport reported an error. Logged only; close comes separately.
    pub fn on_error(&self, session: &Session, error: &dyn fmt::Display) {
        tracing::error!(
            connection_id = %session.id(),
            name = ?session.identity(),
            error = %error,
            "Connection error"
        );
    }

    /// The transport session closed: release the identity and leave any room
    pub fn close(&self, mut session: Session) {
        session.handle().mark_closed();

        if let Some(room) = session.take_room() {
            self.rooms.leave(&room, session.handle());
        }
        match session.take_identity() {
            Some(name) => {
                tracing::info!(connection_id = %session.id(), name = %name, "User disconnected");
                self.clients.unregister(&name);
            }
            None => {
                tracing::info!(connection_id = %session.id(), "Anonymous connection closed");
            }
        }

        self.refresh_gauges();
    }

    /// Run the handler for one decoded message
    #[tracing::instrument(
        name = "signal.dispatch",
        skip(self, session, message),
        fields(connection_id = %session.id(), message_type = message.kind())
    )]
    pub fn dispatch(&self, session: &mut Session, message: ClientMessage) {
        self.stats.messages_handled.fetch_add(1, Ordering::Relaxed);
        SignalMetrics::record_received(message.kind());

        match message {
            ClientMessage::Login { name } => self.handle_login(session, name),
            ClientMessage::Create { room } => self.handle_create(session, room),
            ClientMessage::Connect { room } => self.handle_connect(session, room),
            ClientMessage::Offer { name, offer } => {
                self.relay(session, &name, "offer", |from| ServerMessage::Offer {
                    name: from,
                    offer,
                })
            }
            ClientMessage::Answer { name, answer } => {
                self.relay(session, &name, "answer", |from| ServerMessage::Answer {
                    name: from,
                    answer,
                })
            }
            ClientMessage::Candidate { name, candidate } => {
                self.relay(session, &name, "candidate", |from| ServerMessage::Candidate {
                    name: from,
                    candidate,
                })
            }
            ClientMessage::Leave => self.handle_leave(session),
        }

        self.refresh_gauges();
    }

    fn handle_login(&self, session: &mut Session, name: String) {
        if let Some(current) = session.identity() {
            tracing::warn!(current = %current, requested = %name, "Login on an already identified connection");
            deliver(session.handle(), LOGIN_FAILURE.clone());
            return;
        }

        match self.clients.register(&name, session.handle().clone()) {
            Ok(()) => {
                tracing::info!(name = %name, "User logged in");
                session.set_identity(name);
                deliver(session.handle(), LOGIN_SUCCESS.clone());
            }
            Err(e) => {
                tracing::info!(error = %e, "Login rejected");
                deliver(session.handle(), LOGIN_FAILURE.clone());
            }
        }
    }

    fn handle_create(&self, session: &mut Session, room: RoomId) {
        let Some(name) = session.identity().map(str::to_owned) else {
            tracing::warn!(room = %room, "Create from a connection that has not logged in");
            deliver(session.handle(), ServerMessage::create_failed(LOGIN_REQUIRED_MESSAGE));
            return;
        };
        if let Some(current) = session.room() {
            tracing::warn!(name = %name, current = %current, room = %room, "Create while already in a room");
            deliver(session.handle(), ServerMessage::create_failed(ALREADY_IN_ROOM_MESSAGE));
            return;
        }

        match self.rooms.create(&room, Member::new(name, session.handle().clone())) {
            Ok(()) => {
                session.enter_room(room);
                deliver(session.handle(), CREATE_SUCCESS.clone());
            }
            Err(e) => {
                tracing::info!(error = %e, "Create rejected");
                deliver(session.handle(), CREATE_ROOM_EXISTS.clone());
            }
        }
    }

    fn handle_connect(&self, session: &mut Session, room: RoomId) {
        let Some(name) = session.identity().map(str::to_owned) else {
            tracing::warn!(room = %room, "Connect from a connection that has not logged in");
            deliver(session.handle(), CONNECT_FAILURE.clone());
            return;
        };
        if let Some(current) = session.room() {
            tracing::warn!(name = %name, current = %current, room = %room, "Connect while already in a room");
            deliver(session.handle(), CONNECT_FAILURE.clone());
            return;
        }

        match self.rooms.join(&room, Member::new(name.clone(), session.handle().clone())) {
            Ok(existing) => {
                deliver(session.handle(), CONNECT_SUCCESS.clone());
                tracing::info!(name = %name, room = %room, "Client connected to room");

                let notice = OutboundMessage::shared(ServerMessage::peer_joined(name));
                for member in existing.iter().filter(|m| m.handle.id != session.id()) {
                    deliver(&member.handle, notice.clone());
                }

                session.enter_room(room);
            }
            Err(e) => {
                tracing::info!(error = %e, "Connect rejected");
                deliver(session.handle(), CONNECT_FAILURE.clone());
            }
        }
    }

    fn handle_leave(&self, session: &mut Session) {
        if session.identity().is_none() {
            tracing::warn!(connection_id = %session.id(), "Leave from a connection that has not logged in");
            return;
        }

        if let Some(room) = session.take_room() {
            self.rooms.leave(&room, session.handle());
        }
        deliver(session.handle(), LEAVE_ACK.clone());
    }

    /// Forward a peer-to-peer payload to `target`, stamped with the sender's
    /// name. Missing or closed targets are dropped without telling the sender.
    fn relay(
        &self,
        session: &Session,
        target: &str,
        kind: &'static str,
        build: impl FnOnce(String) -> ServerMessage,
    ) {
        let Some(from) = session.identity() else {
            tracing::warn!(target_name = %target, "Dropping {} from a connection that has not logged in", kind);
            self.record_dropped(kind);
            return;
        };

        match self.clients.lookup(target) {
            Some(handle) if handle.is_initialized() => {
                tracing::info!(from = %from, to = %target, "Sending {}", kind);
                deliver(&handle, build(from.to_string()));
                self.stats.relays_delivered.fetch_add(1, Ordering::Relaxed);
                SignalMetrics::record_relay_delivered(kind);
            }
            _ => {
                tracing::warn!(from = %from, target_name = %target, "Target session is not available, dropping {}", kind);
                self.record_dropped(kind);
            }
        }
    }

    fn record_dropped(&self, kind: &str) {
        self.stats.relays_dropped.fetch_add(1, Ordering::Relaxed);
        SignalMetrics::record_relay_dropped(kind);
    }

    fn refresh_gauges(&self) {
        ConnectionMetrics::set_registry_sizes(self.clients.len(), self.rooms.len());
    }
}

/// Fire-and-forget send; a closed channel means the peer is already going away
fn deliver(handle: &ConnectionHandle, message: impl Into<OutboundMessage>) {
    if handle.send(message).is_err() {
        tracing::debug!(connection_id = %handle.id, "Outbound channel closed, message dropped");
    }
}
