//! Recipe storage and the social surface around it. List-valued fields
//! (ingredients, instructions, images, tags) are stored as JSON text columns
//! and decoded at the edge.

pub mod crud;
pub mod engagement;
pub mod feed;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::models::UserSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn parse(s: &str) -> Option<Difficulty> {
        match s {
            "Easy" => Some(Difficulty::Easy),
            "Medium" => Some(Difficulty::Medium),
            "Hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Breakfast,
    Lunch,
    Dinner,
    Dessert,
    Snack,
    Beverage,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Breakfast => "Breakfast",
            Category::Lunch => "Lunch",
            Category::Dinner => "Dinner",
            Category::Dessert => "Dessert",
            Category::Snack => "Snack",
            Category::Beverage => "Beverage",
        }
    }

    pub fn parse(s: &str) -> Option<Category> {
        match s {
            "Breakfast" => Some(Category::Breakfast),
            "Lunch" => Some(Category::Lunch),
            "Dinner" => Some(Category::Dinner),
            "Dessert" => Some(Category::Dessert),
            "Snack" => Some(Category::Snack),
            "Beverage" => Some(Category::Beverage),
            _ => None,
        }
    }
}

/// Full recipe shape returned by every recipe endpoint, with engagement
/// counts and the viewer's own like/save state folded in.
#[derive(Debug, Serialize)]
pub struct RecipeView {
    pub id: String,
    pub author: UserSummary,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub cooking_time_minutes: i64,
    pub difficulty: String,
    pub category: String,
    pub is_public: bool,
    pub likes_count: i64,
    pub comments_count: i64,
    pub is_liked: bool,
    pub is_saved: bool,
    pub created_at: String,
    pub updated_at: String,
}

fn decode_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

/// Shared SELECT used by every listing query; each caller appends its own
/// WHERE/ORDER/LIMIT clauses. ?1 is the viewer id for the like/save flags.
pub const RECIPE_SELECT: &str = "SELECT r.id, r.title, r.description, r.ingredients, r.instructions, r.images,
        r.tags, r.cooking_time_minutes, r.difficulty, r.category, r.is_public,
        r.created_at, r.updated_at,
        u.id, u.username, u.full_name, u.profile_picture,
        (SELECT COUNT(*) FROM recipe_likes l WHERE l.recipe_id = r.id),
        (SELECT COUNT(*) FROM recipe_comments c WHERE c.recipe_id = r.id),
        EXISTS(SELECT 1 FROM recipe_likes l WHERE l.recipe_id = r.id AND l.user_id = ?1),
        EXISTS(SELECT 1 FROM recipe_saves s WHERE s.recipe_id = r.id AND s.user_id = ?1)
 FROM recipes r JOIN users u ON u.id = r.author";

pub fn recipe_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecipeView> {
    let ingredients: String = row.get(3)?;
    let instructions: String = row.get(4)?;
    let images: String = row.get(5)?;
    let tags: String = row.get(6)?;
    Ok(RecipeView {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        ingredients: decode_list(&ingredients),
        instructions: decode_list(&instructions),
        images: decode_list(&images),
        tags: decode_list(&tags),
        cooking_time_minutes: row.get(7)?,
        difficulty: row.get(8)?,
        category: row.get(9)?,
        is_public: row.get::<_, i64>(10)? != 0,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
        author: UserSummary {
            id: row.get(13)?,
            username: row.get(14)?,
            full_name: row.get(15)?,
            profile_picture: row.get(16)?,
        },
        likes_count: row.get(17)?,
        comments_count: row.get(18)?,
        is_liked: row.get::<_, i64>(19)? != 0,
        is_saved: row.get::<_, i64>(20)? != 0,
    })
}

/// Load one recipe by id, or None.
pub fn load_recipe(
    conn: &Connection,
    viewer: &str,
    recipe_id: &str,
) -> rusqlite::Result<Option<RecipeView>> {
    let sql = format!("{RECIPE_SELECT} WHERE r.id = ?2");
    match conn.query_row(&sql, rusqlite::params![viewer, recipe_id], recipe_from_row) {
        Ok(view) => Ok(Some(view)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_round_trips_known_values() {
        for s in ["Easy", "Medium", "Hard"] {
            let d = Difficulty::parse(s).unwrap();
            assert_eq!(d.as_str(), s);
        }
        assert!(Difficulty::parse("Impossible").is_none());
        assert!(Difficulty::parse("easy").is_none());
    }

    #[test]
    fn category_rejects_unknown_values() {
        assert!(Category::parse("Dinner").is_some());
        assert!(Category::parse("Brunch").is_none());
    }

    #[test]
    fn decode_list_tolerates_garbage() {
        assert_eq!(decode_list(r#"["a","b"]"#), vec!["a", "b"]);
        assert!(decode_list("not json").is_empty());
        assert!(decode_list("").is_empty());
    }
}
