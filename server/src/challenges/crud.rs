//! Time-boxed cooking challenges. A challenge is joinable only while its
//! window is open and its active flag is set; participation is one row per
//! (challenge, user).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::auth::middleware::Claims;
use crate::db::with_conn;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ChallengeView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub emoji: String,
    pub start_date: String,
    pub end_date: String,
    pub prize: String,
    pub rules: Vec<String>,
    pub hashtags: Vec<String>,
    pub is_active: bool,
    pub participants_count: i64,
    pub joined: bool,
    pub created_at: String,
}

const CHALLENGE_SELECT: &str = "SELECT c.id, c.title, c.description, c.emoji, c.start_date, c.end_date, c.prize,
        c.rules, c.hashtags, c.is_active, c.created_at,
        (SELECT COUNT(*) FROM challenge_participants p WHERE p.challenge_id = c.id),
        EXISTS(SELECT 1 FROM challenge_participants p
               WHERE p.challenge_id = c.id AND p.user_id = ?1)
 FROM challenges c";

fn challenge_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChallengeView> {
    let rules: String = row.get(7)?;
    let hashtags: String = row.get(8)?;
    Ok(ChallengeView {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        emoji: row.get(3)?,
        start_date: row.get(4)?,
        end_date: row.get(5)?,
        prize: row.get(6)?,
        rules: serde_json::from_str(&rules).unwrap_or_default(),
        hashtags: serde_json::from_str(&hashtags).unwrap_or_default(),
        is_active: row.get::<_, i64>(9)? != 0,
        created_at: row.get(10)?,
        participants_count: row.get(11)?,
        joined: row.get::<_, i64>(12)? != 0,
    })
}

fn load_challenge(
    conn: &Connection,
    viewer: &str,
    challenge_id: &str,
) -> Result<ChallengeView, ApiError> {
    let sql = format!("{CHALLENGE_SELECT} WHERE c.id = ?2");
    conn.query_row(&sql, rusqlite::params![viewer, challenge_id], challenge_from_row)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => ApiError::not_found("Challenge not found"),
            other => other.into(),
        })
}

/// GET /api/challenges/current — The active challenge whose window contains
/// now; 404 when none is running.
pub async fn current_challenge(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<ChallengeView>, ApiError> {
    let me = claims.sub;
    let challenge = with_conn(&state.db, move |conn| {
        let now = Utc::now().to_rfc3339();
        let sql = format!(
            "{CHALLENGE_SELECT}
             WHERE c.is_active = 1 AND c.start_date <= ?2 AND c.end_date > ?2
             ORDER BY c.start_date DESC LIMIT 1"
        );
        conn.query_row(&sql, rusqlite::params![me, now], challenge_from_row)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    ApiError::not_found("No active challenge right now")
                }
                other => other.into(),
            })
    })
    .await?;
    Ok(Json(challenge))
}

/// GET /api/challenges — All challenges, newest window first.
pub async fn list_challenges(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<ChallengeView>>, ApiError> {
    let me = claims.sub;
    let challenges = with_conn(&state.db, move |conn| {
        let sql = format!("{CHALLENGE_SELECT} ORDER BY c.start_date DESC");
        let mut stmt = conn.prepare(&sql)?;
        let rows: Vec<ChallengeView> = stmt
            .query_map(rusqlite::params![me], challenge_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    })
    .await?;
    Ok(Json(challenges))
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub message: String,
    pub challenge: ChallengeView,
}

/// POST /api/challenges/{id}/join
pub async fn join_challenge(
    State(state): State<AppState>,
    claims: Claims,
    Path(challenge_id): Path<String>,
) -> Result<Json<JoinResponse>, ApiError> {
    let me = claims.sub;
    let challenge = with_conn(&state.db, move |conn| {
        let view = load_challenge(conn, &me, &challenge_id)?;
        if !view.is_active {
            return Err(ApiError::bad_request("Challenge is not active"));
        }
        let now = Utc::now().to_rfc3339();
        if now < view.start_date || now >= view.end_date {
            return Err(ApiError::bad_request("Challenge is not currently running"));
        }
        if view.joined {
            return Err(ApiError::bad_request("Already joined this challenge"));
        }

        conn.execute(
            "INSERT INTO challenge_participants (challenge_id, user_id, joined_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![challenge_id, me, now],
        )?;
        load_challenge(conn, &me, &challenge_id)
    })
    .await?;

    Ok(Json(JoinResponse {
        message: "Challenge joined".to_string(),
        challenge,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ChallengePayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub prize: Option<String>,
    #[serde(default)]
    pub rules: Vec<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

/// POST /api/challenges — Create a challenge. Dates must be RFC 3339 and
/// the window must be non-empty.
pub async fn create_challenge(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<ChallengePayload>,
) -> Result<(StatusCode, Json<ChallengeView>), ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::bad_request("Title is required"));
    }
    if payload.description.trim().is_empty() {
        return Err(ApiError::bad_request("Description is required"));
    }
    let start = DateTime::parse_from_rfc3339(&payload.start_date)
        .map_err(|_| ApiError::bad_request("start_date must be an RFC 3339 timestamp"))?;
    let end = DateTime::parse_from_rfc3339(&payload.end_date)
        .map_err(|_| ApiError::bad_request("end_date must be an RFC 3339 timestamp"))?;
    if end <= start {
        return Err(ApiError::bad_request("end_date must be after start_date"));
    }

    let me = claims.sub;
    let challenge = with_conn(&state.db, move |conn| {
        let id = uuid::Uuid::now_v7().to_string();
        let rules = serde_json::to_string(&payload.rules).map_err(|_| ApiError::Internal)?;
        let hashtags = serde_json::to_string(&payload.hashtags).map_err(|_| ApiError::Internal)?;
        conn.execute(
            "INSERT INTO challenges (id, title, description, emoji, start_date, end_date,
                                     prize, rules, hashtags, is_active, created_at)
             VALUES (?1, ?2, ?3, COALESCE(?4, '🏆'), ?5, ?6,
                     COALESCE(?7, 'Recognition and Badge'), ?8, ?9, 1, ?10)",
            rusqlite::params![
                id,
                payload.title.trim(),
                payload.description.trim(),
                payload.emoji,
                start.with_timezone(&Utc).to_rfc3339(),
                end.with_timezone(&Utc).to_rfc3339(),
                payload.prize,
                rules,
                hashtags,
                Utc::now().to_rfc3339(),
            ],
        )?;
        load_challenge(conn, &me, &id)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(challenge)))
}
