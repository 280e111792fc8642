use axum::{extract::State, http::StatusCode, Json};
use bcrypt::{hash, DEFAULT_COST};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::jwt;
use crate::db::with_conn;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub profile_picture: String,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub bio: String,
    pub profile_picture: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: String,
    pub token: String,
    pub user: AccountResponse,
}

/// POST /api/auth/signup — Create an account and return a fresh token.
/// Duplicate username or email is a 400 with a field-specific message.
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    if body.username.trim().is_empty() || body.email.trim().is_empty() {
        return Err(ApiError::bad_request("Username and email are required"));
    }
    if !body.email.contains('@') {
        return Err(ApiError::bad_request("Invalid email format"));
    }
    if body.password.len() < 8 {
        return Err(ApiError::bad_request("Password must be at least 8 characters"));
    }

    let account = with_conn(&state.db, move |conn| {
        // Field-specific duplicate message, matching the client's expectations
        let existing_email: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1",
            rusqlite::params![body.email],
            |row| row.get(0),
        )?;
        if existing_email > 0 {
            return Err(ApiError::bad_request("Email already exists"));
        }
        let existing_username: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1",
            rusqlite::params![body.username],
            |row| row.get(0),
        )?;
        if existing_username > 0 {
            return Err(ApiError::bad_request("Username already exists"));
        }

        // bcrypt is CPU-bound — we are already on the blocking pool here
        let password_hash = hash(&body.password, DEFAULT_COST).map_err(|e| {
            tracing::error!(error = %e, "Password hashing failed");
            ApiError::Internal
        })?;

        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO users (id, username, email, password_hash, full_name, bio, profile_picture, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            rusqlite::params![
                id,
                body.username,
                body.email,
                password_hash,
                body.full_name,
                body.bio,
                body.profile_picture,
                now
            ],
        )?;

        Ok(AccountResponse {
            id,
            username: body.username,
            email: body.email,
            full_name: body.full_name,
            bio: body.bio,
            profile_picture: body.profile_picture,
            created_at: now,
        })
    })
    .await?;

    let token = jwt::issue_access_token(&state.jwt_secret, &account.id, &account.username)
        .map_err(|e| {
            tracing::error!(error = %e, "Token issue failed");
            ApiError::Internal
        })?;

    tracing::info!(user_id = %account.id, username = %account.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created successfully".to_string(),
            token,
            user: account,
        }),
    ))
}
