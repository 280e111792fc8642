use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

use crate::auth::middleware::Claims;
use crate::db::models::UserSummary;
use crate::db::with_conn;
use crate::error::ApiError;
use crate::state::AppState;

use super::crud::{story_from_row, StoryView, STORY_SELECT};

#[derive(Debug, Serialize)]
pub struct StoryGroup {
    pub author: UserSummary,
    pub stories: Vec<StoryView>,
    pub has_unviewed: bool,
    pub latest_at: String,
}

/// GET /api/stories/feed — Active stories from the caller, their friends
/// and the people they follow, grouped per author. Stories within a group
/// run oldest first; groups are ordered by their newest story. Groups with
/// anything the caller has not seen sort ahead of fully-viewed ones.
pub async fn story_feed(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<StoryGroup>>, ApiError> {
    let me = claims.sub;
    let groups = with_conn(&state.db, move |conn| {
        let sql = format!(
            "{STORY_SELECT}
             WHERE s.is_active = 1 AND s.expires_at > ?2
               AND (s.author = ?1
                    OR s.author IN (SELECT CASE WHEN user_a = ?1 THEN user_b ELSE user_a END
                                    FROM friendships WHERE user_a = ?1 OR user_b = ?1)
                    OR s.author IN (SELECT followed FROM follows WHERE follower = ?1))
             ORDER BY s.author, s.created_at ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let stories: Vec<StoryView> = stmt
            .query_map(rusqlite::params![me, Utc::now().to_rfc3339()], story_from_row)?
            .filter_map(|r| r.ok())
            .collect();

        // Rows arrive clustered by author, so grouping is a single pass.
        let mut groups: Vec<StoryGroup> = Vec::new();
        for story in stories {
            match groups.last_mut() {
                Some(group) if group.author.id == story.author.id => {
                    group.has_unviewed |= !story.viewed && story.author.id != me;
                    group.latest_at = story.created_at.clone();
                    group.stories.push(story);
                }
                _ => groups.push(StoryGroup {
                    author: story.author.clone(),
                    has_unviewed: !story.viewed && story.author.id != me,
                    latest_at: story.created_at.clone(),
                    stories: vec![story],
                }),
            }
        }

        groups.sort_by(|a, b| {
            b.has_unviewed
                .cmp(&a.has_unviewed)
                .then_with(|| b.latest_at.cmp(&a.latest_at))
        });
        Ok(groups)
    })
    .await?;
    Ok(Json(groups))
}

/// GET /api/stories/mine — The caller's own active stories, oldest first.
pub async fn my_stories(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<StoryView>>, ApiError> {
    let me = claims.sub;
    let stories = with_conn(&state.db, move |conn| {
        let sql = format!(
            "{STORY_SELECT} WHERE s.author = ?1 AND s.is_active = 1 AND s.expires_at > ?2
             ORDER BY s.created_at ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows: Vec<StoryView> = stmt
            .query_map(rusqlite::params![me, Utc::now().to_rfc3339()], story_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    })
    .await?;
    Ok(Json(stories))
}
