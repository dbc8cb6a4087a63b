use std::sync::Arc;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::connection_manager::RoomId;

/// Opaque session description / ICE candidate object, relayed untouched
pub type Payload = Map<String, Value>;

/// Text sent with a failed `create`
pub const ROOM_EXISTS_MESSAGE: &str = "the room by specified id already exist";

/// Text sent with a failed `create` from a connection that has not logged in
pub const LOGIN_REQUIRED_MESSAGE: &str = "login required";

/// Text sent with a failed `create` from a connection that is already in a room
pub const ALREADY_IN_ROOM_MESSAGE: &str = "already in a room";

/// Text sent for a message whose `type` is not part of the protocol
pub const UNRECOGNIZED_COMMAND_MESSAGE: &str = "Unrecognized command";

const KNOWN_TYPES: [&str; 7] = [
    "login",
    "create",
    "connect",
    "offer",
    "answer",
    "candidate",
    "leave",
];

/// Messages sent from client to server.
///
/// Each variant carries only the fields legal for its `type`; a message that
/// decodes into this enum has already passed field validation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Login { name: String },
    Create { room: RoomId },
    Connect { room: RoomId },
    Offer { name: String, offer: Payload },
    Answer { name: String, answer: Payload },
    Candidate { name: String, candidate: Payload },
    Leave,
}

impl ClientMessage {
    /// The wire `type` tag of this message
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::Create { .. } => "create",
            Self::Connect { .. } => "connect",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::Candidate { .. } => "candidate",
            Self::Leave => "leave",
        }
    }
}

/// Why an inbound text frame could not become a [`ClientMessage`]
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("payload is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("payload has no string `type` field")]
    MissingType,

    #[error("unrecognized message type `{0}`")]
    UnknownType(String),

    #[error("invalid `{kind}` message: {source}")]
    InvalidFields {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Decode and validate one inbound text frame
pub fn decode(text: &str) -> Result<ClientMessage, DecodeError> {
    let value: Value = serde_json::from_str(text).map_err(DecodeError::Malformed)?;

    let kind = match value.get("type") {
        Some(Value::String(kind)) => kind.clone(),
        _ => return Err(DecodeError::MissingType),
    };

    if !KNOWN_TYPES.contains(&kind.as_str()) {
        return Err(DecodeError::UnknownType(kind));
    }

    serde_json::from_value(value).map_err(|source| DecodeError::InvalidFields { kind, source })
}

/// `"true"` / `"false"` as the protocol spells them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    #[serde(rename = "true")]
    Success,
    #[serde(rename = "false")]
    Failure,
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Login {
        success: Outcome,
    },
    Create {
        success: Outcome,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Reply to the connection that asked to join a room
    #[serde(rename = "connect")]
    ConnectResult { success: Outcome },
    /// Notice to an existing room member that someone joined
    #[serde(rename = "connect")]
    PeerJoined { name: String },
    Offer {
        name: String,
        offer: Payload,
    },
    Answer {
        name: String,
        answer: Payload,
    },
    Candidate {
        name: String,
        candidate: Payload,
    },
    Leave,
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn create_failed(message: impl Into<String>) -> Self {
        Self::Create {
            success: Outcome::Failure,
            message: Some(message.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn peer_joined(name: impl Into<String>) -> Self {
        Self::PeerJoined { name: name.into() }
    }
}

/// What actually travels over a connection's outbound channel.
///
/// Messages that go to many connections, and the fixed protocol replies, are
/// serialized once and shared.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    Raw(ServerMessage),
    Serialized(Arc<str>),
}

impl OutboundMessage {
    pub fn preserialize(message: &ServerMessage) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(message)?;
        Ok(Self::Serialized(Arc::from(json)))
    }

    /// Serialize once for fan-out, keeping the raw form if that fails
    pub fn shared(message: ServerMessage) -> Self {
        Self::preserialize(&message).unwrap_or(Self::Raw(message))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::Raw(message) => serde_json::to_string(message),
            Self::Serialized(json) => Ok(json.to_string()),
        }
    }
}

impl From<ServerMessage> for OutboundMessage {
    fn from(message: ServerMessage) -> Self {
        Self::Raw(message)
    }
}

// Fixed protocol replies, serialized once on first use and never mutated.
lazy_static! {
    pub static ref LOGIN_SUCCESS: OutboundMessage =
        OutboundMessage::shared(ServerMessage::Login { success: Outcome::Success });
    pub static ref LOGIN_FAILURE: OutboundMessage =
        OutboundMessage::shared(ServerMessage::Login { success: Outcome::Failure });
    pub static ref CREATE_SUCCESS: OutboundMessage = OutboundMessage::shared(ServerMessage::Create {
        success: Outcome::Success,
        message: None,
    });
    pub static ref CREATE_ROOM_EXISTS: OutboundMessage =
        OutboundMessage::shared(ServerMessage::create_failed(ROOM_EXISTS_MESSAGE));
    pub static ref CONNECT_SUCCESS: OutboundMessage =
        OutboundMessage::shared(ServerMessage::ConnectResult { success: Outcome::Success });
    pub static ref CONNECT_FAILURE: OutboundMessage =
        OutboundMessage::shared(ServerMessage::ConnectResult { success: Outcome::Failure });
    pub static ref LEAVE_ACK: OutboundMessage = OutboundMessage::shared(ServerMessage::Leave);
    pub static ref UNRECOGNIZED_COMMAND: OutboundMessage =
        OutboundMessage::shared(ServerMessage::error(UNRECOGNIZED_COMMAND_MESSAGE));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_value(message: &OutboundMessage) -> Value {
        serde_json::from_str(&message.to_json().unwrap()).unwrap()
    }

    #[test]
    fn test_decode_login() {
        let msg = decode(r#"{"type":"login","name":"alice"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Login {
                name: "alice".to_string()
            }
        );
        assert_eq!(msg.kind(), "login");
    }

    #[test]
    fn test_decode_leave_ignores_extra_fields() {
        let msg = decode(r#"{"type":"leave","room":"r1"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Leave);
    }

    #[test]
    fn test_decode_offer_keeps_payload() {
        let msg = decode(r#"{"type":"offer","name":"bob","offer":{"sdp":"x","type":"offer"}}"#)
            .unwrap();
        match msg {
            ClientMessage::Offer { name, offer } => {
                assert_eq!(name, "bob");
                assert_eq!(offer.get("sdp"), Some(&json!("x")));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_decode_malformed_json() {
        assert!(matches!(decode("{not json"), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_decode_missing_type() {
        assert!(matches!(
            decode(r#"{"name":"alice"}"#),
            Err(DecodeError::MissingType)
        ));
        assert!(matches!(
            decode(r#"{"type":7,"name":"alice"}"#),
            Err(DecodeError::MissingType)
        ));
        assert!(matches!(decode("[1,2]"), Err(DecodeError::MissingType)));
    }

    #[test]
    fn test_decode_unknown_type() {
        match decode(r#"{"type":"dance"}"#) {
            Err(DecodeError::UnknownType(kind)) => assert_eq!(kind, "dance"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_decode_missing_required_field() {
        match decode(r#"{"type":"login"}"#) {
            Err(DecodeError::InvalidFields { kind, .. }) => assert_eq!(kind, "login"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            decode(r#"{"type":"candidate","name":"bob"}"#),
            Err(DecodeError::InvalidFields { .. })
        ));
    }

    #[test]
    fn test_decode_payload_must_be_object() {
        assert!(matches!(
            decode(r#"{"type":"answer","name":"bob","answer":"sdp"}"#),
            Err(DecodeError::InvalidFields { .. })
        ));
    }

    #[test]
    fn test_fixed_responses_wire_format() {
        assert_eq!(as_value(&LOGIN_SUCCESS), json!({"type": "login", "success": "true"}));
        assert_eq!(as_value(&LOGIN_FAILURE), json!({"type": "login", "success": "false"}));
        assert_eq!(as_value(&CREATE_SUCCESS), json!({"type": "create", "success": "true"}));
        assert_eq!(
            as_value(&CREATE_ROOM_EXISTS),
            json!({
                "type": "create",
                "success": "false",
                "message": "the room by specified id already exist"
            })
        );
        assert_eq!(as_value(&CONNECT_SUCCESS), json!({"type": "connect", "success": "true"}));
        assert_eq!(as_value(&CONNECT_FAILURE), json!({"type": "connect", "success": "false"}));
        assert_eq!(as_value(&LEAVE_ACK), json!({"type": "leave"}));
        assert_eq!(
            as_value(&UNRECOGNIZED_COMMAND),
            json!({"type": "error", "message": "Unrecognized command"})
        );
    }

    #[test]
    fn test_peer_joined_and_relay_wire_format() {
        let joined = OutboundMessage::from(ServerMessage::peer_joined("bob"));
        assert_eq!(as_value(&joined), json!({"type": "connect", "name": "bob"}));

        let mut candidate = Payload::new();
        candidate.insert("candidate".to_string(), json!("candidate:1 1 udp"));
        let relayed = OutboundMessage::from(ServerMessage::Candidate {
            name: "alice".to_string(),
            candidate,
        });
        assert_eq!(
            as_value(&relayed),
            json!({"type": "candidate", "name": "alice", "candidate": {"candidate": "candidate:1 1 udp"}})
        );
    }
}
