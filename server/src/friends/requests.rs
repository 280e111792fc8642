//! Friend request lifecycle: send, accept, reject, plus the pending-request
//! and friend listings. Requests are directional rows; an accepted request
//! becomes a normalized friendship pair and both directions are cleared.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use crate::auth::middleware::Claims;
use crate::db::models::{are_friends, normalize_pair, user_exists, UserSummary};
use crate::db::with_conn;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// POST /api/friends/request/{id}
pub async fn send_request(
    State(state): State<AppState>,
    claims: Claims,
    Path(target_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let me = claims.sub;
    if target_id == me {
        return Err(ApiError::bad_request("Cannot send friend request to yourself"));
    }

    with_conn(&state.db, move |conn| {
        if !user_exists(conn, &target_id)? {
            return Err(ApiError::not_found("User not found"));
        }
        if are_friends(conn, &me, &target_id)? {
            return Err(ApiError::bad_request("Already friends"));
        }

        let outgoing: i64 = conn.query_row(
            "SELECT COUNT(*) FROM friend_requests WHERE from_user = ?1 AND to_user = ?2",
            rusqlite::params![me, target_id],
            |row| row.get(0),
        )?;
        if outgoing > 0 {
            return Err(ApiError::bad_request("Friend request already sent"));
        }

        // A pending request in the other direction means they asked first;
        // the caller should accept it instead of opening a duplicate.
        let incoming: i64 = conn.query_row(
            "SELECT COUNT(*) FROM friend_requests WHERE from_user = ?1 AND to_user = ?2",
            rusqlite::params![target_id, me],
            |row| row.get(0),
        )?;
        if incoming > 0 {
            return Err(ApiError::bad_request("This user has already sent you a friend request"));
        }

        conn.execute(
            "INSERT INTO friend_requests (from_user, to_user, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![me, target_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    })
    .await?;

    Ok(Json(MessageResponse {
        message: "Friend request sent".to_string(),
    }))
}

/// POST /api/friends/accept/{id} — {id} is the requester.
pub async fn accept_request(
    State(state): State<AppState>,
    claims: Claims,
    Path(requester_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let me = claims.sub;

    with_conn(&state.db, move |conn| {
        let pending: i64 = conn.query_row(
            "SELECT COUNT(*) FROM friend_requests WHERE from_user = ?1 AND to_user = ?2",
            rusqlite::params![requester_id, me],
            |row| row.get(0),
        )?;
        if pending == 0 {
            return Err(ApiError::not_found("Friend request not found"));
        }

        let (ua, ub) = normalize_pair(&requester_id, &me);
        conn.execute(
            "INSERT OR IGNORE INTO friendships (user_a, user_b, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![ua, ub, Utc::now().to_rfc3339()],
        )?;
        // Clear both directions in case each side had opened a request.
        conn.execute(
            "DELETE FROM friend_requests
             WHERE (from_user = ?1 AND to_user = ?2) OR (from_user = ?2 AND to_user = ?1)",
            rusqlite::params![requester_id, me],
        )?;
        Ok(())
    })
    .await?;

    Ok(Json(MessageResponse {
        message: "Friend request accepted".to_string(),
    }))
}

/// POST /api/friends/reject/{id} — {id} is the requester.
pub async fn reject_request(
    State(state): State<AppState>,
    claims: Claims,
    Path(requester_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let me = claims.sub;

    with_conn(&state.db, move |conn| {
        let deleted = conn.execute(
            "DELETE FROM friend_requests WHERE from_user = ?1 AND to_user = ?2",
            rusqlite::params![requester_id, me],
        )?;
        if deleted == 0 {
            return Err(ApiError::not_found("Friend request not found"));
        }
        Ok(())
    })
    .await?;

    Ok(Json(MessageResponse {
        message: "Friend request rejected".to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct PendingRequest {
    pub user: UserSummary,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct RequestsResponse {
    pub received: Vec<PendingRequest>,
    pub sent: Vec<PendingRequest>,
}

fn pending_requests(
    conn: &rusqlite::Connection,
    sql: &str,
    me: &str,
) -> rusqlite::Result<Vec<PendingRequest>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(rusqlite::params![me], |row| {
            Ok(PendingRequest {
                user: UserSummary {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    full_name: row.get(2)?,
                    profile_picture: row.get(3)?,
                },
                created_at: row.get(4)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();
    Ok(rows)
}

const RECEIVED_SQL: &str = "SELECT u.id, u.username, u.full_name, u.profile_picture, r.created_at
     FROM friend_requests r JOIN users u ON u.id = r.from_user
     WHERE r.to_user = ?1 ORDER BY r.created_at DESC";
const SENT_SQL: &str = "SELECT u.id, u.username, u.full_name, u.profile_picture, r.created_at
     FROM friend_requests r JOIN users u ON u.id = r.to_user
     WHERE r.from_user = ?1 ORDER BY r.created_at DESC";

/// GET /api/friends/requests — Pending requests in both directions,
/// newest first.
pub async fn list_requests(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<RequestsResponse>, ApiError> {
    let me = claims.sub;
    let response = with_conn(&state.db, move |conn| {
        Ok(RequestsResponse {
            received: pending_requests(conn, RECEIVED_SQL, &me)?,
            sent: pending_requests(conn, SENT_SQL, &me)?,
        })
    })
    .await?;
    Ok(Json(response))
}

/// GET /api/friends — The caller's friends.
pub async fn list_friends(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let me = claims.sub;
    let friends = with_conn(&state.db, move |conn| {
        let mut stmt = conn.prepare(
            "SELECT u.id, u.username, u.full_name, u.profile_picture
             FROM friendships f
             JOIN users u ON u.id = CASE WHEN f.user_a = ?1 THEN f.user_b ELSE f.user_a END
             WHERE f.user_a = ?1 OR f.user_b = ?1
             ORDER BY f.created_at DESC",
        )?;
        let rows: Vec<UserSummary> = stmt
            .query_map(rusqlite::params![me], |row| {
                Ok(UserSummary {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    full_name: row.get(2)?,
                    profile_picture: row.get(3)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    })
    .await?;
    Ok(Json(friends))
}
