use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::connection_manager::{ConnectionHandle, Session};
use crate::metrics::ConnectionMetrics;
use crate::server::AppState;
use crate::signaling::MessageRouter;

use super::message::OutboundMessage;

/// WebSocket upgrade handler for the signaling endpoint
#[tracing::instrument(name = "ws.upgrade", skip_all)]
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.max_message_size(state.settings.websocket.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection
#[tracing::instrument(
    name = "ws.connection",
    skip_all,
    fields(connection_id = tracing::field::Empty)
)]
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_start = std::time::Instant::now();

    // Outbound messages from any connection's handlers land here
    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let handle = Arc::new(ConnectionHandle::new(tx));
    let connection_id = handle.id;
    tracing::Span::current().record("connection_id", tracing::field::display(connection_id));

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Task for sending messages from channel to WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let text = match msg.to_json() {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize message");
                    continue;
                }
            };

            if let Err(e) = ws_sender.send(Message::Text(text.into())).await {
                tracing::debug!(error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    let mut session = state.router.open(handle);
    ConnectionMetrics::record_opened();

    loop {
        tokio::select! {
            _ = &mut send_task => {
                tracing::debug!(connection_id = %connection_id, "Send task completed");
                break;
            }
            frame = ws_receiver.next() => match frame {
                Some(Ok(msg)) => {
                    if !process_message(msg, &state.router, &mut session) {
                        break;
                    }
                }
                Some(Err(e)) => {
                    // The stream does not recover after a read error
                    state.router.on_error(&session, &e);
                    break;
                }
                None => break,
            }
        }
    }

    send_task.abort();
    state.router.close(session);
    ConnectionMetrics::record_closed();

    tracing::info!(
        connection_id = %connection_id,
        duration_secs = connection_start.elapsed().as_secs_f64(),
        "WebSocket connection closed"
    );
}

/// Process a received WebSocket frame.
/// Returns false if the connection should be closed.
fn process_message(msg: Message, router: &MessageRouter, session: &mut Session) -> bool {
    match msg {
        Message::Text(text) => {
            router.on_message(session, text.as_str());
            true
        }
        Message::Binary(_) => {
            tracing::debug!(connection_id = %session.id(), "Ignoring binary frame");
            true
        }
        // Axum answers pings itself
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            tracing::debug!(connection_id = %session.id(), "Received close frame");
            false
        }
    }
}
