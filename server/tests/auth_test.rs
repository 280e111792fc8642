//! Integration tests for signup, login, and the JWT-protected profile route.

use serde_json::json;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::net::TcpListener;

/// Helper: start the server on a random port and return the base URL.
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
        // Keep tmp_dir alive so the data directory isn't deleted
        let _keep = tmp_dir;
    });

    (format!("http://{}", addr), addr)
}

fn signup_body(username: &str, email: &str) -> serde_json::Value {
    json!({
        "username": username,
        "email": email,
        "password": "hunter2hunter2",
        "full_name": "Test Cook",
    })
}

#[tokio::test]
async fn signup_returns_token_and_account() {
    let (base, _) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/auth/signup", base))
        .json(&signup_body("alice", "alice@example.com"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["email"], "alice@example.com");
    // Password material must never appear in responses
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn signup_rejects_short_password_and_bad_email() {
    let (base, _) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/auth/signup", base))
        .json(&json!({
            "username": "bob",
            "email": "bob@example.com",
            "password": "short",
            "full_name": "Bob",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(format!("{}/api/auth/signup", base))
        .json(&json!({
            "username": "bob",
            "email": "not-an-email",
            "password": "hunter2hunter2",
            "full_name": "Bob",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn signup_reports_which_field_is_taken() {
    let (base, _) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/auth/signup", base))
        .json(&signup_body("carol", "carol@example.com"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    // Same email, different username
    let resp = client
        .post(format!("{}/api/auth/signup", base))
        .json(&signup_body("carol2", "carol@example.com"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Email already exists");

    // Same username, different email
    let resp = client
        .post(format!("{}/api/auth/signup", base))
        .json(&signup_body("carol", "carol2@example.com"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Username already exists");
}

#[tokio::test]
async fn login_round_trip_and_wrong_password() {
    let (base, _) = start_test_server().await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/api/auth/signup", base))
        .json(&signup_body("dave", "dave@example.com"))
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{}/api/auth/login", base))
        .json(&json!({"email": "dave@example.com", "password": "hunter2hunter2"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert_eq!(body["user"]["username"], "dave");
    assert!(body["user"]["friends"].as_array().unwrap().is_empty());

    let resp = client
        .post(format!("{}/api/auth/login", base))
        .json(&json!({"email": "dave@example.com", "password": "wrong-password"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    // Same message for unknown email and bad password
    assert_eq!(body["message"], "Invalid email or password");

    let resp = client
        .post(format!("{}/api/auth/login", base))
        .json(&json!({"email": "nobody@example.com", "password": "hunter2hunter2"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
async fn profile_requires_valid_token() {
    let (base, _) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/auth/signup", base))
        .json(&signup_body("erin", "erin@example.com"))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    // No token
    let resp = client
        .get(format!("{}/api/users/profile", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Garbage token
    let resp = client
        .get(format!("{}/api/users/profile", base))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Real token
    let resp = client
        .get(format!("{}/api/users/profile", base))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["username"], "erin");
}

#[tokio::test]
async fn auth_endpoints_are_rate_limited() {
    let (base, _) = start_test_server().await;
    let client = reqwest::Client::new();

    // Burst of 5 allowed, the 6th should be throttled
    let mut statuses = Vec::new();
    for i in 0..6 {
        let resp = client
            .post(format!("{}/api/auth/login", base))
            .json(&json!({"email": format!("u{}@example.com", i), "password": "x"}))
            .send()
            .await
            .unwrap();
        statuses.push(resp.status().as_u16());
    }
    assert_eq!(statuses[5], 429, "statuses: {:?}", statuses);
}
