//! Browse surfaces: the paginated public feed, the most-liked listing, and
//! per-user recommendations blending liked categories with followed authors.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::Claims;
use crate::db::with_conn;
use crate::error::ApiError;
use crate::state::AppState;

use super::{recipe_from_row, RecipeView, RECIPE_SELECT};

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub recipes: Vec<RecipeView>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub has_more: bool,
}

/// GET /api/recipes/feed?page&limit — Public recipes, newest first.
/// Pages are 1-based; out-of-range values are clamped rather than rejected.
pub async fn feed(
    State(state): State<AppState>,
    claims: Claims,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedResponse>, ApiError> {
    let me = claims.sub;
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = (page - 1) * limit;

    let (recipes, total) = with_conn(&state.db, move |conn| {
        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM recipes WHERE is_public = 1",
            [],
            |row| row.get(0),
        )?;
        let sql = format!(
            "{RECIPE_SELECT} WHERE r.is_public = 1
             ORDER BY r.created_at DESC LIMIT ?2 OFFSET ?3"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows: Vec<RecipeView> = stmt
            .query_map(rusqlite::params![me, limit, offset], recipe_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok((rows, total))
    })
    .await?;

    Ok(Json(FeedResponse {
        has_more: offset + (recipes.len() as i64) < total,
        recipes,
        page,
        limit,
        total,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: Option<i64>,
}

/// GET /api/recipes/popular?limit= — Public recipes by like count, with
/// recency breaking ties. Default 10.
pub async fn popular(
    State(state): State<AppState>,
    claims: Claims,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<RecipeView>>, ApiError> {
    let me = claims.sub;
    let limit = query.limit.unwrap_or(10).clamp(1, MAX_PAGE_SIZE);
    let recipes = with_conn(&state.db, move |conn| {
        let sql = format!(
            "{RECIPE_SELECT} WHERE r.is_public = 1
             ORDER BY (SELECT COUNT(*) FROM recipe_likes l WHERE l.recipe_id = r.id) DESC,
                      r.created_at DESC
             LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows: Vec<RecipeView> = stmt
            .query_map(rusqlite::params![me, limit], recipe_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    })
    .await?;
    Ok(Json(recipes))
}

/// GET /api/recipes/recommendations?limit= — Public recipes from categories
/// the caller has liked or from authors they follow, excluding their own
/// posts and anything already liked. Backfilled with the newest public
/// recipes when the personalized pool comes up short. Default 10.
pub async fn recommendations(
    State(state): State<AppState>,
    claims: Claims,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<RecipeView>>, ApiError> {
    let me = claims.sub;
    let limit = query.limit.unwrap_or(10).clamp(1, MAX_PAGE_SIZE) as usize;
    let recipes = with_conn(&state.db, move |conn| {
        let sql = format!(
            "{RECIPE_SELECT}
             WHERE r.is_public = 1 AND r.author != ?1
               AND r.id NOT IN (SELECT recipe_id FROM recipe_likes WHERE user_id = ?1)
               AND (r.category IN (SELECT r2.category FROM recipe_likes l
                                   JOIN recipes r2 ON r2.id = l.recipe_id
                                   WHERE l.user_id = ?1)
                    OR r.author IN (SELECT followed FROM follows WHERE follower = ?1))
             ORDER BY r.created_at DESC
             LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows: Vec<RecipeView> = stmt
            .query_map(rusqlite::params![me, limit as i64], recipe_from_row)?
            .filter_map(|r| r.ok())
            .collect();

        if rows.len() < limit {
            let need = (limit - rows.len()) as i64;
            let seen: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
            let fill_sql = format!(
                "{RECIPE_SELECT} WHERE r.is_public = 1 AND r.author != ?1
                   AND r.id NOT IN (SELECT recipe_id FROM recipe_likes WHERE user_id = ?1)
                 ORDER BY r.created_at DESC LIMIT ?2"
            );
            let mut fill = conn.prepare(&fill_sql)?;
            // Over-fetch so already-selected rows can be skipped in memory.
            let extra: Vec<RecipeView> = fill
                .query_map(
                    rusqlite::params![me, need + seen.len() as i64],
                    recipe_from_row,
                )?
                .filter_map(|r| r.ok())
                .filter(|r| !seen.contains(&r.id))
                .take(need as usize)
                .collect();
            rows.extend(extra);
        }
        Ok(rows)
    })
    .await?;
    Ok(Json(recipes))
}
