//! Integration tests for the WebSocket relay: auth close codes, join,
//! end-to-end message forwarding, delivery acks, and disconnect cleanup.

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Helper: start the server on a random port and return the base URL and addr.
async fn start_test_server() -> (String, SocketAddr) {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let db = recipeshare_server::db::init_db(&data_dir).expect("Failed to init DB");
    let jwt_secret = recipeshare_server::auth::jwt::load_or_generate_jwt_secret(&data_dir)
        .expect("Failed to generate JWT secret");

    let state = recipeshare_server::state::AppState {
        db,
        jwt_secret,
        connections: recipeshare_server::ws::new_connection_directory(),
        started_at: Instant::now(),
    };

    let app = recipeshare_server::routes::build_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
        let _keep = tmp_dir;
    });

    (format!("http://{}", addr), addr)
}

/// Sign up a user over REST and return (user_id, token).
async fn signup(base: &str, username: &str) -> (String, String) {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/auth/signup", base))
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "hunter2hunter2",
            "full_name": format!("{} Cook", username),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = resp.json().await.unwrap();
    (
        body["user"]["id"].as_str().unwrap().to_string(),
        body["token"].as_str().unwrap().to_string(),
    )
}

/// Connect to /ws with the given token, send a join event, and wait for the
/// connection_status confirmation.
async fn connect_and_join(addr: SocketAddr, token: &str, user_id: &str) -> WsStream {
    let ws_url = format!("ws://{}/ws?token={}", addr, token);
    let (mut ws, _) = tokio_tungstenite::connect_async(&ws_url)
        .await
        .expect("WS connect failed");

    ws.send(Message::Text(
        json!({"type": "join", "user_id": user_id}).to_string().into(),
    ))
    .await
    .unwrap();

    let event = next_json(&mut ws).await;
    assert_eq!(event["type"], "connection_status");
    assert_eq!(event["status"], "connected");
    assert_eq!(event["user_id"], user_id);
    ws
}

/// Read the next text frame as JSON, skipping pings, with a timeout.
async fn next_json(ws: &mut WsStream) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("Timed out waiting for WS message")
            .expect("WS stream ended")
            .expect("WS error");
        match msg {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("Unexpected WS message: {:?}", other),
        }
    }
}

#[tokio::test]
async fn invalid_token_closes_with_4002() {
    let (_base, addr) = start_test_server().await;

    let ws_url = format!("ws://{}/ws?token=not_a_jwt", addr);
    let (mut ws, _) = tokio_tungstenite::connect_async(&ws_url)
        .await
        .expect("WS connect failed");

    let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("Expected close within timeout")
        .expect("WS stream ended");
    match msg {
        Ok(Message::Close(Some(frame))) => {
            assert_eq!(u16::from(frame.code), 4002, "Expected close code 4002");
        }
        Ok(other) => assert!(other.is_close(), "Expected close, got: {:?}", other),
        Err(_) => {} // Abrupt close is also acceptable
    }
}

#[tokio::test]
async fn message_delivered_to_connected_recipient() {
    let (base, addr) = start_test_server().await;
    let (alice_id, alice_token) = signup(&base, "alice").await;
    let (bob_id, bob_token) = signup(&base, "bob").await;

    let mut alice = connect_and_join(addr, &alice_token, &alice_id).await;
    let mut bob = connect_and_join(addr, &bob_token, &bob_id).await;

    alice
        .send(Message::Text(
            json!({
                "type": "send_message",
                "recipient_id": bob_id,
                "body": "dinner at 8?",
                "sender_id": alice_id,
            })
            .to_string()
            .into(),
        ))
        .await
        .unwrap();

    // Bob receives the forward
    let event = next_json(&mut bob).await;
    assert_eq!(event["type"], "new_message");
    assert_eq!(event["sender_id"], alice_id);
    assert_eq!(event["body"], "dinner at 8?");
    assert!(!event["timestamp"].as_str().unwrap().is_empty());

    // Alice gets a delivered ack
    let event = next_json(&mut alice).await;
    assert_eq!(event["type"], "message_delivered");
    assert_eq!(event["recipient_id"], bob_id);
    assert_eq!(event["status"], "delivered");
}

#[tokio::test]
async fn offline_recipient_acks_sent() {
    let (base, addr) = start_test_server().await;
    let (alice_id, alice_token) = signup(&base, "carol").await;

    let mut alice = connect_and_join(addr, &alice_token, &alice_id).await;

    alice
        .send(Message::Text(
            json!({
                "type": "send_message",
                "recipient_id": "nobody-here",
                "body": "anyone home?",
                "sender_id": alice_id,
            })
            .to_string()
            .into(),
        ))
        .await
        .unwrap();

    let event = next_json(&mut alice).await;
    assert_eq!(event["type"], "message_delivered");
    assert_eq!(event["recipient_id"], "nobody-here");
    assert_eq!(event["status"], "sent");
}

#[tokio::test]
async fn missing_fields_yield_message_error() {
    let (base, addr) = start_test_server().await;
    let (dave_id, dave_token) = signup(&base, "dave").await;

    let mut dave = connect_and_join(addr, &dave_token, &dave_id).await;

    // Empty body short-circuits before any lookup
    dave.send(Message::Text(
        json!({
            "type": "send_message",
            "recipient_id": "someone",
            "body": "",
            "sender_id": dave_id,
        })
        .to_string()
        .into(),
    ))
    .await
    .unwrap();

    let event = next_json(&mut dave).await;
    assert_eq!(event["type"], "message_error");
    assert_eq!(event["error"], "Missing required fields");

    // Unparseable frame gets its own error without killing the connection
    dave.send(Message::Text("{not json".to_string().into()))
        .await
        .unwrap();
    let event = next_json(&mut dave).await;
    assert_eq!(event["type"], "message_error");
    assert_eq!(event["error"], "Invalid message");

    // Still functional afterwards
    dave.send(Message::Text(
        json!({
            "type": "send_message",
            "recipient_id": "ghost",
            "body": "still here",
            "sender_id": dave_id,
        })
        .to_string()
        .into(),
    ))
    .await
    .unwrap();
    let event = next_json(&mut dave).await;
    assert_eq!(event["type"], "message_delivered");
}

#[tokio::test]
async fn disconnect_downgrades_delivery_to_sent() {
    let (base, addr) = start_test_server().await;
    let (erin_id, erin_token) = signup(&base, "erin").await;
    let (frank_id, frank_token) = signup(&base, "frank").await;

    let mut erin = connect_and_join(addr, &erin_token, &erin_id).await;
    let mut frank = connect_and_join(addr, &frank_token, &frank_id).await;

    frank.close(None).await.unwrap();
    // Give the server a moment to run the disconnect cleanup
    tokio::time::sleep(Duration::from_millis(200)).await;

    erin.send(Message::Text(
        json!({
            "type": "send_message",
            "recipient_id": frank_id,
            "body": "you there?",
            "sender_id": erin_id,
        })
        .to_string()
        .into(),
    ))
    .await
    .unwrap();

    let event = next_json(&mut erin).await;
    assert_eq!(event["type"], "message_delivered");
    assert_eq!(event["status"], "sent");
}

#[tokio::test]
async fn rejoin_replaces_previous_connection() {
    let (base, addr) = start_test_server().await;
    let (gina_id, gina_token) = signup(&base, "gina").await;
    let (hank_id, hank_token) = signup(&base, "hank").await;

    // Gina connects twice with the same identity; the second join wins.
    let _gina_old = connect_and_join(addr, &gina_token, &gina_id).await;
    let mut gina_new = connect_and_join(addr, &gina_token, &gina_id).await;

    let mut hank = connect_and_join(addr, &hank_token, &hank_id).await;
    hank.send(Message::Text(
        json!({
            "type": "send_message",
            "recipient_id": gina_id,
            "body": "which device?",
            "sender_id": hank_id,
        })
        .to_string()
        .into(),
    ))
    .await
    .unwrap();

    // The replacement connection receives the message
    let event = next_json(&mut gina_new).await;
    assert_eq!(event["type"], "new_message");
    assert_eq!(event["body"], "which device?");

    let event = next_json(&mut hank).await;
    assert_eq!(event["type"], "message_delivered");
    assert_eq!(event["status"], "delivered");
}
