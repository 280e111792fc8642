//! Shared row types and query helpers used across handler modules.
//! Module-local request/response shapes live next to their handlers.

use rusqlite::Connection;
use serde::Serialize;

/// Compact user projection embedded in feed items, comment lists,
/// friend lists, and story groups.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub profile_picture: String,
}

impl UserSummary {
    pub fn fetch(conn: &Connection, user_id: &str) -> rusqlite::Result<UserSummary> {
        conn.query_row(
            "SELECT id, username, full_name, profile_picture FROM users WHERE id = ?1",
            rusqlite::params![user_id],
            |row| {
                Ok(UserSummary {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    full_name: row.get(2)?,
                    profile_picture: row.get(3)?,
                })
            },
        )
    }
}

/// Normalize an unordered user pair so it can key a unique row.
/// Used by friendships and conversations (smaller id first).
pub fn normalize_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// True if the two users are friends (pair order handled internally).
pub fn are_friends(conn: &Connection, a: &str, b: &str) -> rusqlite::Result<bool> {
    let (ua, ub) = normalize_pair(a, b);
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM friendships WHERE user_a = ?1 AND user_b = ?2",
        rusqlite::params![ua, ub],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// True if a user row exists.
pub fn user_exists(conn: &Connection, user_id: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE id = ?1",
        rusqlite::params![user_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
