mod handler;
mod message;

pub use handler::ws_handler;
pub use message::{
    decode, ClientMessage, DecodeError, OutboundMessage, Outcome, Payload, ServerMessage,
    ALREADY_IN_ROOM_MESSAGE, CONNECT_FAILURE, CONNECT_SUCCESS, CREATE_ROOM_EXISTS,
    CREATE_SUCCESS, LEAVE_ACK, LOGIN_FAILURE, LOGIN_REQUIRED_MESSAGE, LOGIN_SUCCESS,
    ROOM_EXISTS_MESSAGE, UNRECOGNIZED_COMMAND, UNRECOGNIZED_COMMAND_MESSAGE,
};
