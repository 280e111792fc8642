//! Relay operations over the connection directory.
//!
//! Best-effort, point-to-point forwarding between live connections addressed
//! by user identity. Nothing here is persisted: a message to an offline
//! recipient is acknowledged as `sent` and then gone — durable chat history
//! is written separately through the REST layer before the client asks the
//! relay to notify the recipient.

use chrono::Utc;

use crate::ws::protocol::{send_event, DeliveryStatus, ServerEvent};
use crate::ws::{ConnectionDirectory, ConnectionSender, RegisteredConnection};

/// Enter (or re-enter) the directory under `user_id`.
///
/// An empty identity is rejected rather than inserted as a bogus key.
/// An existing entry for the same identity is silently replaced — last
/// writer wins; the displaced connection is not notified.
pub fn join(
    directory: &ConnectionDirectory,
    conn_id: u64,
    tx: &ConnectionSender,
    user_id: &str,
    joined: &mut Option<String>,
) {
    if user_id.is_empty() {
        tracing::warn!(conn_id, "Join with empty user id rejected");
        send_event(
            tx,
            &ServerEvent::MessageError {
                error: "Missing user id".to_string(),
            },
        );
        return;
    }

    directory.insert(
        user_id.to_string(),
        RegisteredConnection {
            conn_id,
            sender: tx.clone(),
        },
    );
    *joined = Some(user_id.to_string());

    tracing::debug!(conn_id, user_id = %user_id, "Connection joined directory");

    send_event(
        tx,
        &ServerEvent::ConnectionStatus {
            status: "connected",
            user_id: user_id.to_string(),
        },
    );
}

/// Forward an ephemeral message to the recipient's live connection.
///
/// The sender identity comes from the envelope when given, otherwise from
/// the identity this connection joined with. Missing sender, recipient, or
/// body short-circuits with a MessageError and no forwarding side effect.
/// The sender always gets exactly one acknowledgement: `delivered` if the
/// recipient's connection took the forward, `sent` if the recipient is
/// offline (or its transport write failed — indistinguishable here).
pub fn relay_message(
    directory: &ConnectionDirectory,
    tx: &ConnectionSender,
    joined: Option<&str>,
    envelope_sender: &str,
    recipient_id: &str,
    body: &str,
) {
    let sender_id = if envelope_sender.is_empty() {
        joined.unwrap_or("")
    } else {
        envelope_sender
    };

    if sender_id.is_empty() || recipient_id.is_empty() || body.is_empty() {
        send_event(
            tx,
            &ServerEvent::MessageError {
                error: "Missing required fields".to_string(),
            },
        );
        return;
    }

    let timestamp = Utc::now().to_rfc3339();

    let status = match directory.get(recipient_id) {
        Some(entry) => {
            let forwarded = send_event(
                &entry.sender,
                &ServerEvent::NewMessage {
                    sender_id: sender_id.to_string(),
                    body: body.to_string(),
                    timestamp: timestamp.clone(),
                },
            );
            if forwarded {
                DeliveryStatus::Delivered
            } else {
                // Closed channel: the connection is half torn down.
                // Report the same degraded status as an offline recipient.
                DeliveryStatus::Sent
            }
        }
        None => DeliveryStatus::Sent,
    };

    send_event(
        tx,
        &ServerEvent::MessageDelivered {
            recipient_id: recipient_id.to_string(),
            status,
            timestamp,
        },
    );
}

/// Remove this connection's directory entry on teardown.
///
/// Only evicts the entry if it still points at this connection — a later
/// join may have replaced the handle, and the replacement must survive.
/// A connection that never joined is a no-op.
pub fn disconnect(directory: &ConnectionDirectory, conn_id: u64, joined: Option<&str>) {
    if let Some(user_id) = joined {
        let removed = directory
            .remove_if(user_id, |_, entry| entry.conn_id == conn_id)
            .is_some();
        tracing::debug!(conn_id, user_id = %user_id, removed, "Connection left directory");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::new_connection_directory;
    use axum::extract::ws::Message;
    use tokio::sync::mpsc;

    fn connection() -> (ConnectionSender, mpsc::UnboundedReceiver<Message>) {
        mpsc::unbounded_channel()
    }

    fn recv_event(rx: &mut mpsc::UnboundedReceiver<Message>) -> serde_json::Value {
        match rx.try_recv().expect("expected an event") {
            Message::Text(text) => serde_json::from_str(text.as_str()).expect("valid JSON event"),
            other => panic!("expected text frame, got {:?}", other),
        }
    }

    fn assert_empty(rx: &mut mpsc::UnboundedReceiver<Message>) {
        assert!(rx.try_recv().is_err(), "expected no further events");
    }

    #[test]
    fn join_replaces_earlier_handle_for_same_identity() {
        let dir = new_connection_directory();
        let (tx1, mut rx1) = connection();
        let (tx2, mut rx2) = connection();
        let mut joined1 = None;
        let mut joined2 = None;

        join(&dir, 1, &tx1, "u", &mut joined1);
        join(&dir, 2, &tx2, "u", &mut joined2);

        assert_eq!(dir.get("u").unwrap().conn_id, 2);
        assert_eq!(dir.len(), 1);

        // Both connections got their own join confirmations
        assert_eq!(recv_event(&mut rx1)["type"], "connection_status");
        assert_eq!(recv_event(&mut rx2)["type"], "connection_status");

        // Messages addressed to "u" now land on the second connection only
        let (sender_tx, mut sender_rx) = connection();
        relay_message(&dir, &sender_tx, Some("a"), "", "u", "hi");
        assert_empty(&mut rx1);
        assert_eq!(recv_event(&mut rx2)["type"], "new_message");
        assert_eq!(recv_event(&mut sender_rx)["status"], "delivered");
    }

    #[test]
    fn disconnect_removes_entry_and_downgrades_delivery() {
        let dir = new_connection_directory();
        let (tx, mut rx) = connection();
        let mut joined = None;

        join(&dir, 7, &tx, "u", &mut joined);
        assert_eq!(recv_event(&mut rx)["type"], "connection_status");

        disconnect(&dir, 7, joined.as_deref());
        assert!(dir.get("u").is_none());

        let (sender_tx, mut sender_rx) = connection();
        relay_message(&dir, &sender_tx, Some("a"), "", "u", "hi");
        let ack = recv_event(&mut sender_rx);
        assert_eq!(ack["type"], "message_delivered");
        assert_eq!(ack["status"], "sent");
        assert_empty(&mut rx);
    }

    #[test]
    fn disconnect_of_replaced_handle_keeps_replacement() {
        let dir = new_connection_directory();
        let (tx1, _rx1) = connection();
        let (tx2, _rx2) = connection();
        let mut joined1 = None;
        let mut joined2 = None;

        join(&dir, 1, &tx1, "u", &mut joined1);
        join(&dir, 2, &tx2, "u", &mut joined2);

        // The stale connection's teardown must not evict the replacement
        disconnect(&dir, 1, joined1.as_deref());
        assert_eq!(dir.get("u").unwrap().conn_id, 2);

        disconnect(&dir, 2, joined2.as_deref());
        assert!(dir.get("u").is_none());
    }

    #[test]
    fn missing_fields_short_circuit_without_forwarding() {
        let dir = new_connection_directory();
        let (recip_tx, mut recip_rx) = connection();
        let mut joined = None;
        join(&dir, 1, &recip_tx, "bob", &mut joined);
        recv_event(&mut recip_rx); // connection_status

        let (tx, mut rx) = connection();

        // No payload
        relay_message(&dir, &tx, Some("alice"), "", "bob", "");
        let err = recv_event(&mut rx);
        assert_eq!(err["type"], "message_error");
        assert_eq!(err["error"], "Missing required fields");
        assert_empty(&mut recip_rx);

        // No recipient
        relay_message(&dir, &tx, Some("alice"), "", "", "hi");
        assert_eq!(recv_event(&mut rx)["type"], "message_error");

        // No sender anywhere (never joined, empty envelope sender)
        relay_message(&dir, &tx, None, "", "bob", "hi");
        assert_eq!(recv_event(&mut rx)["type"], "message_error");
        assert_empty(&mut recip_rx);
    }

    #[test]
    fn delivery_routes_to_exactly_one_recipient() {
        let dir = new_connection_directory();
        let (alice_tx, mut alice_rx) = connection();
        let (bob_tx, mut bob_rx) = connection();
        let mut ja = None;
        let mut jb = None;
        join(&dir, 1, &alice_tx, "alice", &mut ja);
        join(&dir, 2, &bob_tx, "bob", &mut jb);
        recv_event(&mut alice_rx);
        recv_event(&mut bob_rx);

        relay_message(&dir, &alice_tx, ja.as_deref(), "", "bob", "hi");

        let msg = recv_event(&mut bob_rx);
        assert_eq!(msg["type"], "new_message");
        assert_eq!(msg["sender_id"], "alice");
        assert_eq!(msg["body"], "hi");
        assert!(msg["timestamp"].as_str().is_some());
        assert_empty(&mut bob_rx);

        let ack = recv_event(&mut alice_rx);
        assert_eq!(ack["type"], "message_delivered");
        assert_eq!(ack["recipient_id"], "bob");
        assert_eq!(ack["status"], "delivered");
        assert_empty(&mut alice_rx);
    }

    #[test]
    fn offline_recipient_yields_sent_and_no_forward() {
        let dir = new_connection_directory();
        let (tx, mut rx) = connection();
        let mut joined = None;
        join(&dir, 1, &tx, "alice", &mut joined);
        recv_event(&mut rx);

        relay_message(&dir, &tx, joined.as_deref(), "", "carol", "hello?");

        let ack = recv_event(&mut rx);
        assert_eq!(ack["type"], "message_delivered");
        assert_eq!(ack["status"], "sent");
        assert_empty(&mut rx);
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn empty_join_is_rejected_not_inserted() {
        let dir = new_connection_directory();
        let (tx, mut rx) = connection();
        let mut joined = None;

        join(&dir, 1, &tx, "", &mut joined);

        assert!(dir.is_empty());
        assert!(joined.is_none());
        assert_eq!(recv_event(&mut rx)["type"], "message_error");
    }

    #[test]
    fn rejoin_same_handle_is_idempotent() {
        let dir = new_connection_directory();
        let (tx, mut rx) = connection();
        let mut joined = None;

        join(&dir, 1, &tx, "u1", &mut joined);
        join(&dir, 1, &tx, "u1", &mut joined);

        assert_eq!(dir.len(), 1);
        assert_eq!(dir.get("u1").unwrap().conn_id, 1);
        recv_event(&mut rx);
        recv_event(&mut rx);

        disconnect(&dir, 1, joined.as_deref());
        assert!(dir.is_empty());
    }

    #[test]
    fn closed_recipient_channel_degrades_to_sent() {
        let dir = new_connection_directory();
        let (bob_tx, bob_rx) = connection();
        let mut jb = None;
        join(&dir, 1, &bob_tx, "bob", &mut jb);
        drop(bob_rx); // transport gone, entry not yet cleaned up

        let (tx, mut rx) = connection();
        relay_message(&dir, &tx, Some("alice"), "", "bob", "hi");

        let ack = recv_event(&mut rx);
        assert_eq!(ack["status"], "sent");
    }

    #[test]
    fn envelope_sender_wins_over_joined_identity() {
        let dir = new_connection_directory();
        let (bob_tx, mut bob_rx) = connection();
        let mut jb = None;
        join(&dir, 1, &bob_tx, "bob", &mut jb);
        recv_event(&mut bob_rx);

        let (tx, mut rx) = connection();
        relay_message(&dir, &tx, Some("joined-id"), "envelope-id", "bob", "hi");

        assert_eq!(recv_event(&mut bob_rx)["sender_id"], "envelope-id");
        assert_eq!(recv_event(&mut rx)["status"], "delivered");
    }
}
