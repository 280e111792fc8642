//! Ephemeral stories. Each story lives 24 hours from creation; a background
//! task flips expired rows inactive so listing queries stay cheap.

pub mod crud;
pub mod feed;
pub mod retention;

pub const STORY_TTL_HOURS: i64 = 24;
