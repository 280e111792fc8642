use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use crate::auth::middleware::Claims;
use crate::db::models::user_exists;
use crate::db::with_conn;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FollowerEntry {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub profile_picture: String,
    pub bio: String,
    pub followed_at: String,
}

/// GET /api/users/followers — Who follows the caller, newest first.
pub async fn list_followers(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<FollowerEntry>>, ApiError> {
    let me = claims.sub;
    let followers = with_conn(&state.db, move |conn| {
        let mut stmt = conn.prepare(
            "SELECT u.id, u.username, u.full_name, u.profile_picture, u.bio, f.created_at
             FROM follows f JOIN users u ON u.id = f.follower
             WHERE f.followed = ?1
             ORDER BY f.created_at DESC",
        )?;
        let rows: Vec<FollowerEntry> = stmt
            .query_map(rusqlite::params![me], |row| {
                Ok(FollowerEntry {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    full_name: row.get(2)?,
                    profile_picture: row.get(3)?,
                    bio: row.get(4)?,
                    followed_at: row.get(5)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    })
    .await?;
    Ok(Json(followers))
}

#[derive(Debug, Serialize)]
pub struct FollowToggleResponse {
    pub following: bool,
    pub message: String,
}

/// POST /api/users/{id}/follow — Toggle following the target user.
pub async fn toggle_follow(
    State(state): State<AppState>,
    claims: Claims,
    Path(target_id): Path<String>,
) -> Result<Json<FollowToggleResponse>, ApiError> {
    let me = claims.sub;
    if target_id == me {
        return Err(ApiError::bad_request("Cannot follow yourself"));
    }

    let following = with_conn(&state.db, move |conn| {
        if !user_exists(conn, &target_id)? {
            return Err(ApiError::not_found("User not found"));
        }

        let already: i64 = conn.query_row(
            "SELECT COUNT(*) FROM follows WHERE follower = ?1 AND followed = ?2",
            rusqlite::params![me, target_id],
            |row| row.get(0),
        )?;

        if already > 0 {
            conn.execute(
                "DELETE FROM follows WHERE follower = ?1 AND followed = ?2",
                rusqlite::params![me, target_id],
            )?;
            Ok(false)
        } else {
            conn.execute(
                "INSERT INTO follows (follower, followed, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![me, target_id, Utc::now().to_rfc3339()],
            )?;
            Ok(true)
        }
    })
    .await?;

    Ok(Json(FollowToggleResponse {
        following,
        message: if following {
            "User followed".to_string()
        } else {
            "User unfollowed".to_string()
        },
    }))
}
