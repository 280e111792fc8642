//! Wire protocol for the real-time relay: a closed set of tagged JSON
//! events over WebSocket text frames, dispatched to the relay operations.

use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::ws::relay;
use crate::ws::ConnectionSender;

/// Events a client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Announce the caller's user identity and enter the directory.
    Join {
        #[serde(default)]
        user_id: String,
    },
    /// Ask the relay to forward an ephemeral message to another user.
    SendMessage {
        #[serde(default)]
        recipient_id: String,
        #[serde(default)]
        body: String,
        #[serde(default)]
        sender_id: String,
    },
}

/// Events the server may emit.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Join confirmation.
    ConnectionStatus { status: &'static str, user_id: String },
    /// A relayed message, delivered only to the recipient's live connection.
    NewMessage {
        sender_id: String,
        body: String,
        timestamp: String,
    },
    /// Delivery acknowledgement to the sender. `delivered` means the
    /// recipient's connection received the forward; `sent` means the relay
    /// accepted the message but the recipient was not reachable.
    MessageDelivered {
        recipient_id: String,
        status: DeliveryStatus,
        timestamp: String,
    },
    /// Validation failure, reported to the sender only.
    MessageError { error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Delivered,
    Sent,
}

/// Serialize and push an event onto a connection's channel.
/// Returns false if the channel is closed or serialization fails — the
/// caller treats that the same as an unreachable recipient.
pub fn send_event(tx: &ConnectionSender, event: &ServerEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => tx.send(Message::Text(json.into())).is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize server event");
            false
        }
    }
}

/// Handle an incoming text frame: decode the event and dispatch to the relay.
/// A malformed frame yields a MessageError to this client only — one
/// client's garbage must never affect other connections.
pub fn handle_text_message(
    text: &str,
    tx: &ConnectionSender,
    state: &AppState,
    conn_id: u64,
    joined: &mut Option<String>,
) {
    match serde_json::from_str::<ClientEvent>(text) {
        Ok(ClientEvent::Join { user_id }) => {
            relay::join(&state.connections, conn_id, tx, &user_id, joined);
        }
        Ok(ClientEvent::SendMessage {
            recipient_id,
            body,
            sender_id,
        }) => {
            relay::relay_message(
                &state.connections,
                tx,
                joined.as_deref(),
                &sender_id,
                &recipient_id,
                &body,
            );
        }
        Err(e) => {
            tracing::debug!(error = %e, "Unparseable client event");
            send_event(
                tx,
                &ServerEvent::MessageError {
                    error: "Invalid message".to_string(),
                },
            );
        }
    }
}
