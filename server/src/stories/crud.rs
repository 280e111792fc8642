use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::Claims;
use crate::db::models::UserSummary;
use crate::db::with_conn;
use crate::error::ApiError;
use crate::state::AppState;

use super::STORY_TTL_HOURS;

#[derive(Debug, Deserialize)]
pub struct StoryPayload {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub text_color: Option<String>,
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default)]
    pub font_size: Option<i64>,
    #[serde(default)]
    pub text_align: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StoryView {
    pub id: String,
    pub author: UserSummary,
    pub content: String,
    pub image: Option<String>,
    pub background_color: String,
    pub text_color: String,
    pub font: String,
    pub font_size: i64,
    pub text_align: String,
    pub views_count: i64,
    pub viewed: bool,
    pub expires_at: String,
    pub created_at: String,
}

/// Shared SELECT for story listings; ?1 is the viewer id.
pub(super) const STORY_SELECT: &str = "SELECT s.id, s.content, s.image, s.background_color, s.text_color, s.font,
        s.font_size, s.text_align, s.expires_at, s.created_at,
        u.id, u.username, u.full_name, u.profile_picture,
        (SELECT COUNT(*) FROM story_views v WHERE v.story_id = s.id),
        EXISTS(SELECT 1 FROM story_views v WHERE v.story_id = s.id AND v.user_id = ?1)
 FROM stories s JOIN users u ON u.id = s.author";

pub(super) fn story_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoryView> {
    Ok(StoryView {
        id: row.get(0)?,
        content: row.get(1)?,
        image: row.get(2)?,
        background_color: row.get(3)?,
        text_color: row.get(4)?,
        font: row.get(5)?,
        font_size: row.get(6)?,
        text_align: row.get(7)?,
        expires_at: row.get(8)?,
        created_at: row.get(9)?,
        author: UserSummary {
            id: row.get(10)?,
            username: row.get(11)?,
            full_name: row.get(12)?,
            profile_picture: row.get(13)?,
        },
        views_count: row.get(14)?,
        viewed: row.get::<_, i64>(15)? != 0,
    })
}

/// POST /api/stories — A story needs text content or an image; expiry is
/// fixed at 24 hours from creation.
pub async fn create_story(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<StoryPayload>,
) -> Result<(StatusCode, Json<StoryView>), ApiError> {
    let has_image = payload.image.as_deref().is_some_and(|i| !i.is_empty());
    if payload.content.trim().is_empty() && !has_image {
        return Err(ApiError::bad_request("Story needs content or an image"));
    }
    let me = claims.sub;

    let story = with_conn(&state.db, move |conn| {
        let id = uuid::Uuid::now_v7().to_string();
        let now = Utc::now();
        let expires = now + Duration::hours(STORY_TTL_HOURS);
        conn.execute(
            "INSERT INTO stories (id, author, content, image, background_color, text_color,
                                  font, font_size, text_align, is_active, expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4,
                     COALESCE(?5, '#000000'), COALESCE(?6, '#ffffff'),
                     COALESCE(?7, 'Arial'), COALESCE(?8, 24), COALESCE(?9, 'center'),
                     1, ?10, ?11)",
            rusqlite::params![
                id,
                me,
                payload.content.trim(),
                payload.image,
                payload.background_color,
                payload.text_color,
                payload.font,
                payload.font_size,
                payload.text_align,
                expires.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;
        let sql = format!("{STORY_SELECT} WHERE s.id = ?2");
        let view = conn.query_row(&sql, rusqlite::params![me, id], story_from_row)?;
        Ok(view)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(story)))
}

/// GET /api/stories/{id} — A single active, unexpired story.
pub async fn get_story(
    State(state): State<AppState>,
    claims: Claims,
    Path(story_id): Path<String>,
) -> Result<Json<StoryView>, ApiError> {
    let me = claims.sub;
    let story = with_conn(&state.db, move |conn| {
        let sql = format!(
            "{STORY_SELECT} WHERE s.id = ?2 AND s.is_active = 1 AND s.expires_at > ?3"
        );
        conn.query_row(
            &sql,
            rusqlite::params![me, story_id, Utc::now().to_rfc3339()],
            story_from_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => ApiError::not_found("Story not found"),
            other => other.into(),
        })
    })
    .await?;
    Ok(Json(story))
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// POST /api/stories/{id}/view — Recording a view is idempotent; the
/// author viewing their own story is not counted.
pub async fn view_story(
    State(state): State<AppState>,
    claims: Claims,
    Path(story_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let me = claims.sub;

    with_conn(&state.db, move |conn| {
        let author: String = conn
            .query_row(
                "SELECT author FROM stories WHERE id = ?1 AND is_active = 1 AND expires_at > ?2",
                rusqlite::params![story_id, Utc::now().to_rfc3339()],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => ApiError::not_found("Story not found"),
                other => other.into(),
            })?;
        if author != me {
            conn.execute(
                "INSERT OR IGNORE INTO story_views (story_id, user_id, viewed_at)
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![story_id, me, Utc::now().to_rfc3339()],
            )?;
        }
        Ok(())
    })
    .await?;

    Ok(Json(MessageResponse {
        message: "Story viewed".to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct StoryViewer {
    pub user: UserSummary,
    pub viewed_at: String,
}

/// GET /api/stories/{id}/views — Author only.
pub async fn story_views(
    State(state): State<AppState>,
    claims: Claims,
    Path(story_id): Path<String>,
) -> Result<Json<Vec<StoryViewer>>, ApiError> {
    let me = claims.sub;
    let viewers = with_conn(&state.db, move |conn| {
        let author: String = conn
            .query_row(
                "SELECT author FROM stories WHERE id = ?1",
                rusqlite::params![story_id],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => ApiError::not_found("Story not found"),
                other => other.into(),
            })?;
        if author != me {
            return Err(ApiError::forbidden("Only the author can see story views"));
        }

        let mut stmt = conn.prepare(
            "SELECT u.id, u.username, u.full_name, u.profile_picture, v.viewed_at
             FROM story_views v JOIN users u ON u.id = v.user_id
             WHERE v.story_id = ?1
             ORDER BY v.viewed_at DESC",
        )?;
        let rows: Vec<StoryViewer> = stmt
            .query_map(rusqlite::params![story_id], |row| {
                Ok(StoryViewer {
                    user: UserSummary {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        full_name: row.get(2)?,
                        profile_picture: row.get(3)?,
                    },
                    viewed_at: row.get(4)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    })
    .await?;
    Ok(Json(viewers))
}

/// DELETE /api/stories/{id} — Author only.
pub async fn delete_story(
    State(state): State<AppState>,
    claims: Claims,
    Path(story_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let me = claims.sub;

    with_conn(&state.db, move |conn| {
        let author: String = conn
            .query_row(
                "SELECT author FROM stories WHERE id = ?1",
                rusqlite::params![story_id],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => ApiError::not_found("Story not found"),
                other => other.into(),
            })?;
        if author != me {
            return Err(ApiError::forbidden("You can only delete your own stories"));
        }
        conn.execute("DELETE FROM stories WHERE id = ?1", rusqlite::params![story_id])?;
        Ok(())
    })
    .await?;

    Ok(Json(MessageResponse {
        message: "Story deleted".to_string(),
    }))
}
