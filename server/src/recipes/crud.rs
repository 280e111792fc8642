use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::middleware::Claims;
use crate::db::with_conn;
use crate::error::ApiError;
use crate::state::AppState;

use super::{load_recipe, recipe_from_row, Category, Difficulty, RecipeView, RECIPE_SELECT};

#[derive(Debug, Deserialize)]
pub struct RecipePayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub cooking_time_minutes: i64,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_public")]
    pub is_public: bool,
}

fn default_public() -> bool {
    true
}

fn validate(payload: &RecipePayload) -> Result<(), ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::bad_request("Title is required"));
    }
    if payload.description.trim().is_empty() {
        return Err(ApiError::bad_request("Description is required"));
    }
    if payload.ingredients.is_empty() {
        return Err(ApiError::bad_request("At least one ingredient is required"));
    }
    if payload.instructions.is_empty() {
        return Err(ApiError::bad_request("At least one instruction is required"));
    }
    if payload.cooking_time_minutes <= 0 {
        return Err(ApiError::bad_request("Cooking time must be positive"));
    }
    if Difficulty::parse(&payload.difficulty).is_none() {
        return Err(ApiError::bad_request("Difficulty must be Easy, Medium or Hard"));
    }
    if Category::parse(&payload.category).is_none() {
        return Err(ApiError::bad_request(
            "Category must be Breakfast, Lunch, Dinner, Dessert, Snack or Beverage",
        ));
    }
    Ok(())
}

fn encode_list(list: &[String]) -> Result<String, ApiError> {
    serde_json::to_string(list).map_err(|_| ApiError::Internal)
}

/// POST /api/recipes
pub async fn create_recipe(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<RecipePayload>,
) -> Result<(StatusCode, Json<RecipeView>), ApiError> {
    validate(&payload)?;
    let author = claims.sub;

    let view = with_conn(&state.db, move |conn| {
        let id = uuid::Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO recipes (id, author, title, description, ingredients, instructions,
                                  images, tags, cooking_time_minutes, difficulty, category,
                                  is_public, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
            rusqlite::params![
                id,
                author,
                payload.title.trim(),
                payload.description.trim(),
                encode_list(&payload.ingredients)?,
                encode_list(&payload.instructions)?,
                encode_list(&payload.images)?,
                encode_list(&payload.tags)?,
                payload.cooking_time_minutes,
                payload.difficulty,
                payload.category,
                payload.is_public as i64,
                now,
            ],
        )?;
        load_recipe(conn, &author, &id)?.ok_or(ApiError::Internal)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/recipes/{id} — Private recipes are visible only to their author.
pub async fn get_recipe(
    State(state): State<AppState>,
    claims: Claims,
    Path(recipe_id): Path<String>,
) -> Result<Json<RecipeView>, ApiError> {
    let me = claims.sub;
    let view = with_conn(&state.db, move |conn| {
        let view = load_recipe(conn, &me, &recipe_id)?
            .ok_or_else(|| ApiError::not_found("Recipe not found"))?;
        if !view.is_public && view.author.id != me {
            return Err(ApiError::not_found("Recipe not found"));
        }
        Ok(view)
    })
    .await?;
    Ok(Json(view))
}

/// PUT /api/recipes/{id} — Author only.
pub async fn update_recipe(
    State(state): State<AppState>,
    claims: Claims,
    Path(recipe_id): Path<String>,
    Json(payload): Json<RecipePayload>,
) -> Result<Json<RecipeView>, ApiError> {
    validate(&payload)?;
    let me = claims.sub;

    let view = with_conn(&state.db, move |conn| {
        let author: String = conn
            .query_row(
                "SELECT author FROM recipes WHERE id = ?1",
                rusqlite::params![recipe_id],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => ApiError::not_found("Recipe not found"),
                other => other.into(),
            })?;
        if author != me {
            return Err(ApiError::forbidden("You can only edit your own recipes"));
        }

        conn.execute(
            "UPDATE recipes SET title = ?1, description = ?2, ingredients = ?3,
                    instructions = ?4, images = ?5, tags = ?6, cooking_time_minutes = ?7,
                    difficulty = ?8, category = ?9, is_public = ?10, updated_at = ?11
             WHERE id = ?12",
            rusqlite::params![
                payload.title.trim(),
                payload.description.trim(),
                encode_list(&payload.ingredients)?,
                encode_list(&payload.instructions)?,
                encode_list(&payload.images)?,
                encode_list(&payload.tags)?,
                payload.cooking_time_minutes,
                payload.difficulty,
                payload.category,
                payload.is_public as i64,
                Utc::now().to_rfc3339(),
                recipe_id,
            ],
        )?;
        load_recipe(conn, &me, &recipe_id)?.ok_or(ApiError::Internal)
    })
    .await?;

    Ok(Json(view))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
}

/// DELETE /api/recipes/{id} — Author only; likes, comments and saves
/// cascade away with the row.
pub async fn delete_recipe(
    State(state): State<AppState>,
    claims: Claims,
    Path(recipe_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let me = claims.sub;

    with_conn(&state.db, move |conn| {
        let author: String = conn
            .query_row(
                "SELECT author FROM recipes WHERE id = ?1",
                rusqlite::params![recipe_id],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => ApiError::not_found("Recipe not found"),
                other => other.into(),
            })?;
        if author != me {
            return Err(ApiError::forbidden("You can only delete your own recipes"));
        }
        conn.execute("DELETE FROM recipes WHERE id = ?1", rusqlite::params![recipe_id])?;
        Ok(())
    })
    .await?;

    Ok(Json(DeleteResponse {
        message: "Recipe deleted".to_string(),
    }))
}

/// GET /api/recipes/user/{id} — A user's recipes, newest first. Private
/// recipes show up only when the caller is looking at their own list.
pub async fn user_recipes(
    State(state): State<AppState>,
    claims: Claims,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<RecipeView>>, ApiError> {
    let me = claims.sub;
    let recipes = with_conn(&state.db, move |conn| {
        let sql = format!(
            "{RECIPE_SELECT} WHERE r.author = ?2 AND (r.is_public = 1 OR r.author = ?1)
             ORDER BY r.created_at DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows: Vec<RecipeView> = stmt
            .query_map(rusqlite::params![me, user_id], recipe_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    })
    .await?;
    Ok(Json(recipes))
}
