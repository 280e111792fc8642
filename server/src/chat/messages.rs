//! Message history and sending. Sending persists the row and upserts the
//! normalized conversation; live fan-out to a connected recipient happens
//! over the relay socket, not here.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::auth::middleware::Claims;
use crate::db::models::{normalize_pair, user_exists};
use crate::db::with_conn;
use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Serialize)]
pub struct MessageView {
    pub id: String,
    pub sender: String,
    pub recipient: String,
    pub body: String,
    pub message_type: String,
    pub is_read: bool,
    pub read_at: Option<String>,
    pub created_at: String,
}

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageView> {
    Ok(MessageView {
        id: row.get(0)?,
        sender: row.get(1)?,
        recipient: row.get(2)?,
        body: row.get(3)?,
        message_type: row.get(4)?,
        is_read: row.get::<_, i64>(5)? != 0,
        read_at: row.get(6)?,
        created_at: row.get(7)?,
    })
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<MessageView>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub has_more: bool,
}

/// GET /api/chat/messages/{user_id}?page&limit — Both directions of the
/// pair, returned in chronological order within the page. Page 1 is the
/// most recent slice.
pub async fn message_history(
    State(state): State<AppState>,
    claims: Claims,
    Path(other_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let me = claims.sub;
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = (page - 1) * limit;

    let (messages, total) = with_conn(&state.db, move |conn| {
        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages
             WHERE (sender = ?1 AND recipient = ?2) OR (sender = ?2 AND recipient = ?1)",
            rusqlite::params![me, other_id],
            |row| row.get(0),
        )?;

        // Newest page first from the DB, then flipped so callers render
        // oldest-to-newest without resorting.
        let mut stmt = conn.prepare(
            "SELECT id, sender, recipient, body, message_type, is_read, read_at, created_at
             FROM messages
             WHERE (sender = ?1 AND recipient = ?2) OR (sender = ?2 AND recipient = ?1)
             ORDER BY created_at DESC
             LIMIT ?3 OFFSET ?4",
        )?;
        let mut rows: Vec<MessageView> = stmt
            .query_map(rusqlite::params![me, other_id, limit, offset], message_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        rows.reverse();
        Ok((rows, total))
    })
    .await?;

    Ok(Json(HistoryResponse {
        has_more: offset + (messages.len() as i64) < total,
        messages,
        page,
        limit,
        total,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SendMessagePayload {
    #[serde(default)]
    pub recipient_id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub message_type: Option<String>,
}

fn upsert_conversation(
    conn: &Connection,
    a: &str,
    b: &str,
    message_id: &str,
    now: &str,
) -> rusqlite::Result<()> {
    let (pa, pb) = normalize_pair(a, b);
    conn.execute(
        "INSERT INTO conversations (id, participant_a, participant_b,
                                    last_message_id, last_activity, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT(participant_a, participant_b)
         DO UPDATE SET last_message_id = ?4, last_activity = ?5",
        rusqlite::params![uuid::Uuid::now_v7().to_string(), pa, pb, message_id, now],
    )?;
    Ok(())
}

/// POST /api/chat/send — Persist a message and bump the conversation.
pub async fn send_message(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<SendMessagePayload>,
) -> Result<(StatusCode, Json<MessageView>), ApiError> {
    let body = payload.body.trim().to_string();
    if payload.recipient_id.is_empty() || body.is_empty() {
        return Err(ApiError::bad_request("Recipient and message body are required"));
    }
    let me = claims.sub;
    if payload.recipient_id == me {
        return Err(ApiError::bad_request("Cannot message yourself"));
    }

    let message = with_conn(&state.db, move |conn| {
        if !user_exists(conn, &payload.recipient_id)? {
            return Err(ApiError::not_found("Recipient not found"));
        }

        let id = uuid::Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        let message_type = payload.message_type.unwrap_or_else(|| "text".to_string());
        conn.execute(
            "INSERT INTO messages (id, sender, recipient, body, message_type,
                                   is_read, read_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, NULL, ?6)",
            rusqlite::params![id, me, payload.recipient_id, body, message_type, now],
        )?;
        upsert_conversation(conn, &me, &payload.recipient_id, &id, &now)?;

        Ok(MessageView {
            id,
            sender: me,
            recipient: payload.recipient_id,
            body,
            message_type,
            is_read: false,
            read_at: None,
            created_at: now,
        })
    })
    .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub marked_read: usize,
}

/// PUT /api/chat/read/{user_id} — Mark everything that user sent the caller
/// as read.
pub async fn mark_read(
    State(state): State<AppState>,
    claims: Claims,
    Path(other_id): Path<String>,
) -> Result<Json<MarkReadResponse>, ApiError> {
    let me = claims.sub;
    let marked = with_conn(&state.db, move |conn| {
        let marked = conn.execute(
            "UPDATE messages SET is_read = 1, read_at = ?3
             WHERE sender = ?1 AND recipient = ?2 AND is_read = 0",
            rusqlite::params![other_id, me, Utc::now().to_rfc3339()],
        )?;
        Ok(marked)
    })
    .await?;

    Ok(Json(MarkReadResponse { marked_read: marked }))
}
