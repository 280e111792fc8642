pub mod actor;
pub mod handler;
pub mod protocol;
pub mod relay;

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Type alias for the sender half of a WebSocket connection's channel.
/// Other parts of the system can clone this to push events to a specific client.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;

/// One live connection registered under a user identity.
/// `conn_id` is process-unique so teardown can tell whether a directory
/// entry still belongs to the connection going away or has since been
/// replaced by a newer join.
#[derive(Clone)]
pub struct RegisteredConnection {
    pub conn_id: u64,
    pub sender: ConnectionSender,
}

/// Connection directory: maps a user identity to its single live connection.
/// At most one entry per identity — a later join for the same identity
/// replaces the earlier handle (last writer wins, no multi-device fan-out).
/// Purely in-memory; rebuilt empty on every process restart.
pub type ConnectionDirectory = Arc<DashMap<String, RegisteredConnection>>;

/// Create a new empty connection directory.
pub fn new_connection_directory() -> ConnectionDirectory {
    Arc::new(DashMap::new())
}

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique connection id.
pub fn next_conn_id() -> u64 {
    NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed)
}
