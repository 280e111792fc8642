use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::auth::middleware::Claims;
use crate::db::with_conn;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub profile_picture: String,
    pub bio: String,
}

/// GET /api/users/search/{query} — Case-insensitive substring match on
/// username or full name, capped at 20 results.
pub async fn search_users(
    State(state): State<AppState>,
    _claims: Claims,
    Path(query): Path<String>,
) -> Result<Json<Vec<SearchResult>>, ApiError> {
    let results = with_conn(&state.db, move |conn| {
        // Escape LIKE wildcards so user input is matched literally
        let escaped = query.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        let pattern = format!("%{}%", escaped);
        let mut stmt = conn.prepare(
            "SELECT id, username, full_name, profile_picture, bio FROM users
             WHERE username LIKE ?1 ESCAPE '\\' OR full_name LIKE ?1 ESCAPE '\\'
             LIMIT 20",
        )?;
        let rows: Vec<SearchResult> = stmt
            .query_map(rusqlite::params![pattern], |row| {
                Ok(SearchResult {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    full_name: row.get(2)?,
                    profile_picture: row.get(3)?,
                    bio: row.get(4)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    })
    .await?;
    Ok(Json(results))
}

#[derive(Debug, Serialize)]
pub struct SuggestedUser {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub profile_picture: String,
    pub bio: String,
    pub created_at: String,
}

/// GET /api/users/suggestions/new — Newest accounts the caller has no
/// relationship with yet (not self, not friends, not followed, no pending
/// friend request either way). Limit 10.
pub async fn suggested_users(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<SuggestedUser>>, ApiError> {
    let me = claims.sub;
    let results = with_conn(&state.db, move |conn| {
        let mut stmt = conn.prepare(
            "SELECT id, username, full_name, profile_picture, bio, created_at FROM users
             WHERE id != ?1
               AND id NOT IN (SELECT CASE WHEN user_a = ?1 THEN user_b ELSE user_a END
                              FROM friendships WHERE user_a = ?1 OR user_b = ?1)
               AND id NOT IN (SELECT followed FROM follows WHERE follower = ?1)
               AND id NOT IN (SELECT to_user FROM friend_requests WHERE from_user = ?1)
               AND id NOT IN (SELECT from_user FROM friend_requests WHERE to_user = ?1)
             ORDER BY created_at DESC
             LIMIT 10",
        )?;
        let rows: Vec<SuggestedUser> = stmt
            .query_map(rusqlite::params![me], |row| {
                Ok(SuggestedUser {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    full_name: row.get(2)?,
                    profile_picture: row.get(3)?,
                    bio: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    })
    .await?;
    Ok(Json(results))
}
