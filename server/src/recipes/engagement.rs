//! Likes, comments and saves. Like and save are idempotent toggles keyed on
//! (recipe, user); comments are append-only rows with their own ids.

use axum::{
    extract::{Path, State},
    http::StatusCode,
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

use super::{load_recipe, recipe_from_row, RecipeView, RECIPE_SELECT};

fn recipe_visible(conn: &Connection, viewer: &str, recipe_id: &str) -> Result<(), ApiError> {
    let row: Option<(String, i64)> = match conn.query_row(
        "SELECT author, is_public FROM recipes WHERE id = ?1",
        rusqlite::params![recipe_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    ) {
        Ok(r) => Some(r),
        Err(rusqlite::Error::QueryReturnedNoRows) => None,
        Err(e) => return Err(e.into()),
    };
    match row {
        Some((author, is_public)) if is_public != 0 || author == viewer => Ok(()),
        _ => Err(ApiError::not_found("Recipe not found")),
    }
}

/// POST /api/recipes/{id}/like — Toggle, returning the updated recipe with
/// the caller's new like state and count folded in.
pub async fn toggle_like(
    State(state): State<AppState>,
    claims: Claims,
    Path(recipe_id): Path<String>,
) -> Result<Json<RecipeView>, ApiError> {
    let me = claims.sub;
    let view = with_conn(&state.db, move |conn| {
        recipe_visible(conn, &me, &recipe_id)?;

        let removed = conn.execute(
            "DELETE FROM recipe_likes WHERE recipe_id = ?1 AND user_id = ?2",
            rusqlite::params![recipe_id, me],
        )?;
        if removed == 0 {
            conn.execute(
                "INSERT INTO recipe_likes (recipe_id, user_id, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![recipe_id, me, Utc::now().to_rfc3339()],
            )?;
        }

        load_recipe(conn, &me, &recipe_id)?.ok_or(ApiError::Internal)
    })
    .await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
pub struct CommentPayload {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: String,
    pub user: UserSummary,
    pub text: String,
    pub created_at: String,
}

/// POST /api/recipes/{id}/comment
pub async fn add_comment(
    State(state): State<AppState>,
    claims: Claims,
    Path(recipe_id): Path<String>,
    Json(payload): Json<CommentPayload>,
) -> Result<(StatusCode, Json<CommentView>), ApiError> {
    let text = payload.text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::bad_request("Comment text is required"));
    }
    let me = claims.sub;

    let comment = with_conn(&state.db, move |conn| {
        recipe_visible(conn, &me, &recipe_id)?;

        let id = uuid::Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO recipe_comments (id, recipe_id, user_id, text, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![id, recipe_id, me, text, now],
        )?;
        let user = UserSummary::fetch(conn, &me)?;
        Ok(CommentView {
            id,
            user,
            text,
            created_at: now,
        })
    })
    .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /api/recipes/{id}/comments — Oldest first.
pub async fn list_comments(
    State(state): State<AppState>,
    claims: Claims,
    Path(recipe_id): Path<String>,
) -> Result<Json<Vec<CommentView>>, ApiError> {
    let me = claims.sub;
    let comments = with_conn(&state.db, move |conn| {
        recipe_visible(conn, &me, &recipe_id)?;

        let mut stmt = conn.prepare(
            "SELECT c.id, c.text, c.created_at, u.id, u.username, u.full_name, u.profile_picture
             FROM recipe_comments c JOIN users u ON u.id = c.user_id
             WHERE c.recipe_id = ?1
             ORDER BY c.created_at ASC",
        )?;
        let rows: Vec<CommentView> = stmt
            .query_map(rusqlite::params![recipe_id], |row| {
                Ok(CommentView {
                    id: row.get(0)?,
                    text: row.get(1)?,
                    created_at: row.get(2)?,
                    user: UserSummary {
                        id: row.get(3)?,
                        username: row.get(4)?,
                        full_name: row.get(5)?,
                        profile_picture: row.get(6)?,
                    },
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    })
    .await?;
    Ok(Json(comments))
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub saved: bool,
    pub message: String,
}

/// POST /api/recipes/{id}/save
pub async fn toggle_save(
    State(state): State<AppState>,
    claims: Claims,
    Path(recipe_id): Path<String>,
) -> Result<Json<SaveResponse>, ApiError> {
    let me = claims.sub;
    let saved = with_conn(&state.db, move |conn| {
        recipe_visible(conn, &me, &recipe_id)?;

        let removed = conn.execute(
            "DELETE FROM recipe_saves WHERE recipe_id = ?1 AND user_id = ?2",
            rusqlite::params![recipe_id, me],
        )?;
        if removed == 0 {
            conn.execute(
                "INSERT INTO recipe_saves (recipe_id, user_id, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![recipe_id, me, Utc::now().to_rfc3339()],
            )?;
            Ok(true)
        } else {
            Ok(false)
        }
    })
    .await?;

    Ok(Json(SaveResponse {
        saved,
        message: if saved {
            "Recipe saved".to_string()
        } else {
            "Recipe unsaved".to_string()
        },
    }))
}

/// GET /api/recipes/liked — Recipes the caller liked, most recent like first.
pub async fn liked_recipes(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<RecipeView>>, ApiError> {
    let me = claims.sub;
    let recipes = with_conn(&state.db, move |conn| {
        let sql = format!(
            "{RECIPE_SELECT}
             JOIN recipe_likes my ON my.recipe_id = r.id AND my.user_id = ?1
             ORDER BY my.created_at DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows: Vec<RecipeView> = stmt
            .query_map(rusqlite::params![me], recipe_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    })
    .await?;
    Ok(Json(recipes))
}

/// GET /api/recipes/saved — The caller's saved recipes, most recent save first.
pub async fn saved_recipes(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<RecipeView>>, ApiError> {
    let me = claims.sub;
    let recipes = with_conn(&state.db, move |conn| {
        let sql = format!(
            "{RECIPE_SELECT}
             JOIN recipe_saves my ON my.recipe_id = r.id AND my.user_id = ?1
             ORDER BY my.created_at DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows: Vec<RecipeView> = stmt
            .query_map(rusqlite::params![me], recipe_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    })
    .await?;
    Ok(Json(recipes))
}
