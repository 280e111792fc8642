use axum::{extract::State, Json};
use bcrypt::verify;
use serde::{Deserialize, Serialize};

use crate::auth::jwt;
use crate::db::with_conn;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub bio: String,
    pub profile_picture: String,
    pub friends: Vec<String>,
    pub following: Vec<String>,
    pub followers: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: LoginUser,
}

/// POST /api/auth/login — Verify credentials and return a token plus the
/// user's social graph ids. Unknown email and wrong password produce the
/// same message so accounts cannot be enumerated.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = with_conn(&state.db, move |conn| {
        // Unknown email gets the credential message; anything else is a
        // genuine server fault and must not masquerade as a bad password.
        let (id, username, password_hash, full_name, bio, profile_picture): (
            String,
            String,
            String,
            String,
            String,
            String,
        ) = conn
            .query_row(
                "SELECT id, username, password_hash, full_name, bio, profile_picture
                 FROM users WHERE email = ?1",
                rusqlite::params![body.email],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    ApiError::bad_request("Invalid email or password")
                }
                other => other.into(),
            })?;

        let valid = verify(&body.password, &password_hash).map_err(|e| {
            tracing::error!(error = %e, "Password verification error");
            ApiError::Internal
        })?;
        if !valid {
            return Err(ApiError::bad_request("Invalid email or password"));
        }

        let mut stmt = conn.prepare(
            "SELECT CASE WHEN user_a = ?1 THEN user_b ELSE user_a END
             FROM friendships WHERE user_a = ?1 OR user_b = ?1",
        )?;
        let friends: Vec<String> = stmt
            .query_map(rusqlite::params![id], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        let mut stmt =
            conn.prepare("SELECT followed FROM follows WHERE follower = ?1")?;
        let following: Vec<String> = stmt
            .query_map(rusqlite::params![id], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        let mut stmt =
            conn.prepare("SELECT follower FROM follows WHERE followed = ?1")?;
        let followers: Vec<String> = stmt
            .query_map(rusqlite::params![id], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(LoginUser {
            id,
            username,
            email: body.email,
            full_name,
            bio,
            profile_picture,
            friends,
            following,
            followers,
        })
    })
    .await?;

    let token = jwt::issue_access_token(&state.jwt_secret, &user.id, &user.username)
        .map_err(|e| {
            tracing::error!(error = %e, "Token issue failed");
            ApiError::Internal
        })?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        user,
    }))
}
