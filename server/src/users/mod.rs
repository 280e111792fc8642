pub mod follow;
pub mod profile;
pub mod search;
