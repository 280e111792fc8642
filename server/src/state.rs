use std::time::Instant;

use crate::db::DbPool;
use crate::ws::ConnectionDirectory;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex>
    pub db: DbPool,
    /// JWT signing secret (256-bit random key)
    pub jwt_secret: Vec<u8>,
    /// Live WebSocket connection directory (one entry per user identity).
    /// Constructed at startup and passed in — never a module-level global —
    /// so tests can build and reset it in isolation.
    pub connections: ConnectionDirectory,
    /// Process start, for the health endpoint's uptime field
    pub started_at: Instant,
}
