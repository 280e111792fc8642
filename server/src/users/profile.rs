use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::auth::middleware::Claims;
use crate::db::models::UserSummary;
use crate::db::with_conn;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub bio: String,
    pub profile_picture: String,
    pub created_at: String,
    pub friends: Vec<UserSummary>,
    pub following: Vec<UserSummary>,
    pub followers: Vec<UserSummary>,
}

fn friend_summaries(conn: &Connection, user_id: &str) -> rusqlite::Result<Vec<UserSummary>> {
    let mut stmt = conn.prepare(
        "SELECT u.id, u.username, u.full_name, u.profile_picture
         FROM friendships f
         JOIN users u ON u.id = CASE WHEN f.user_a = ?1 THEN f.user_b ELSE f.user_a END
         WHERE f.user_a = ?1 OR f.user_b = ?1",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![user_id], |row| {
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
}

fn follow_summaries(
    conn: &Connection,
    user_id: &str,
    direction_sql: &str,
) -> rusqlite::Result<Vec<UserSummary>> {
    let mut stmt = conn.prepare(direction_sql)?;
    let rows = stmt
        .query_map(rusqlite::params![user_id], |row| {
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
}

const FOLLOWING_SQL: &str = "SELECT u.id, u.username, u.full_name, u.profile_picture
     FROM follows f JOIN users u ON u.id = f.followed WHERE f.follower = ?1";
const FOLLOWERS_SQL: &str = "SELECT u.id, u.username, u.full_name, u.profile_picture
     FROM follows f JOIN users u ON u.id = f.follower WHERE f.followed = ?1";

fn load_profile(conn: &Connection, user_id: &str) -> Result<ProfileResponse, ApiError> {
    let (id, username, email, full_name, bio, profile_picture, created_at) = conn
        .query_row(
            "SELECT id, username, email, full_name, bio, profile_picture, created_at
             FROM users WHERE id = ?1",
            rusqlite::params![user_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            },
        )
        .map_err(|_| ApiError::not_found("User not found"))?;

    Ok(ProfileResponse {
        friends: friend_summaries(conn, &id)?,
        following: follow_summaries(conn, &id, FOLLOWING_SQL)?,
        followers: follow_summaries(conn, &id, FOLLOWERS_SQL)?,
        id,
        username,
        email,
        full_name,
        bio,
        profile_picture,
        created_at,
    })
}

/// GET /api/users/profile — Own profile with expanded social graph.
pub async fn get_profile(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user_id = claims.sub;
    let profile = with_conn(&state.db, move |conn| load_profile(conn, &user_id)).await?;
    Ok(Json(profile))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub profile_picture: String,
}

/// PUT /api/users/profile — Update display fields, return the fresh profile.
pub async fn update_profile(
    State(state): State<AppState>,
    claims: Claims,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user_id = claims.sub;
    let profile = with_conn(&state.db, move |conn| {
        let now = Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE users SET full_name = ?1, bio = ?2, profile_picture = ?3, updated_at = ?4
             WHERE id = ?5",
            rusqlite::params![body.full_name, body.bio, body.profile_picture, now, user_id],
        )?;
        if changed == 0 {
            return Err(ApiError::not_found("User not found"));
        }
        load_profile(conn, &user_id)
    })
    .await?;
    Ok(Json(profile))
}

#[derive(Debug, Serialize)]
pub struct RecipeSummary {
    pub id: String,
    pub title: String,
    pub category: String,
    pub images: serde_json::Value,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct PublicProfileResponse {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub bio: String,
    pub profile_picture: String,
    pub created_at: String,
    pub friends: Vec<UserSummary>,
    pub recipes: Vec<RecipeSummary>,
}

/// GET /api/users/{id} — Another user's public profile with their recipes.
pub async fn get_user(
    State(state): State<AppState>,
    _claims: Claims,
    Path(user_id): Path<String>,
) -> Result<Json<PublicProfileResponse>, ApiError> {
    let profile = with_conn(&state.db, move |conn| {
        let (id, username, full_name, bio, profile_picture, created_at) = conn
            .query_row(
                "SELECT id, username, full_name, bio, profile_picture, created_at
                 FROM users WHERE id = ?1",
                rusqlite::params![user_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .map_err(|_| ApiError::not_found("User not found"))?;

        let mut stmt = conn.prepare(
            "SELECT id, title, category, images, created_at FROM recipes
             WHERE author = ?1 AND is_public = 1 ORDER BY created_at DESC",
        )?;
        let recipes: Vec<RecipeSummary> = stmt
            .query_map(rusqlite::params![id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .filter_map(|r| r.ok())
            .map(|(rid, title, category, images, rcreated)| RecipeSummary {
                id: rid,
                title,
                category,
                images: serde_json::from_str(&images).unwrap_or_default(),
                created_at: rcreated,
            })
            .collect();

        Ok(PublicProfileResponse {
            friends: friend_summaries(conn, &id)?,
            recipes,
            id,
            username,
            full_name,
            bio,
            profile_picture,
            created_at,
        })
    })
    .await?;
    Ok(Json(profile))
}
