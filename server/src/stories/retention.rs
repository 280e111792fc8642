//! Background retention task for expired stories.
//!
//! Spawns a tokio task that periodically deactivates stories whose
//! `expires_at` timestamp has passed, and drops their view rows once the
//! story has been inactive long enough that nothing will ask for it again.

use chrono::{Duration, Utc};
use rusqlite::Connection;

use crate::db::DbPool;

use super::STORY_TTL_HOURS;

/// Deactivate expired stories and purge ones that expired over a day ago.
/// Returns (deactivated, purged).
fn sweep_expired(conn: &Connection) -> rusqlite::Result<(usize, usize)> {
    let now = Utc::now();
    let deactivated = conn.execute(
        "UPDATE stories SET is_active = 0 WHERE is_active = 1 AND expires_at <= ?1",
        rusqlite::params![now.to_rfc3339()],
    )?;
    let purge_before = now - Duration::hours(STORY_TTL_HOURS);
    let purged = conn.execute(
        "DELETE FROM stories WHERE is_active = 0 AND expires_at <= ?1",
        rusqlite::params![purge_before.to_rfc3339()],
    )?;
    Ok((deactivated, purged))
}

/// Spawn a background task that sweeps expired stories every
/// `interval_secs` seconds (default 3600 = 1 hour).
pub fn spawn_story_retention(db: DbPool, interval_secs: u64) {
    let interval = std::time::Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            let db_clone = db.clone();
            match tokio::task::spawn_blocking(move || {
                let conn = db_clone
                    .lock()
                    .map_err(|_| rusqlite::Error::InvalidQuery)?;
                sweep_expired(&conn)
            })
            .await
            {
                Ok(Ok((deactivated, purged))) => {
                    if deactivated > 0 || purged > 0 {
                        tracing::info!(
                            "Story retention sweep: deactivated {}, purged {}",
                            deactivated,
                            purged
                        );
                    } else {
                        tracing::debug!("Story retention sweep: nothing expired");
                    }
                }
                Ok(Err(e)) => {
                    tracing::error!("Story retention sweep error: {}", e);
                }
                Err(e) => {
                    tracing::error!("Story retention task join error: {}", e);
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::migrations;

    fn test_conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        migrations().to_latest(&mut conn).unwrap();
        conn
    }

    fn insert_story(conn: &Connection, id: &str, expires_at: &str, is_active: i64) {
        conn.execute(
            "INSERT OR IGNORE INTO users (id, username, email, password_hash, full_name, created_at, updated_at)
             VALUES ('u1', 'cook', 'cook@example.com', 'x', 'Cook', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO stories (id, author, content, is_active, expires_at, created_at)
             VALUES (?1, 'u1', 'hi', ?2, ?3, '2026-01-01T00:00:00Z')",
            rusqlite::params![id, is_active, expires_at],
        )
        .unwrap();
    }

    #[test]
    fn sweep_deactivates_expired_and_keeps_live() {
        let conn = test_conn();
        let past = (Utc::now() - Duration::hours(1)).to_rfc3339();
        let future = (Utc::now() + Duration::hours(1)).to_rfc3339();
        insert_story(&conn, "s-expired", &past, 1);
        insert_story(&conn, "s-live", &future, 1);

        let (deactivated, purged) = sweep_expired(&conn).unwrap();
        assert_eq!(deactivated, 1);
        assert_eq!(purged, 0);

        let active: i64 = conn
            .query_row(
                "SELECT is_active FROM stories WHERE id = 's-live'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(active, 1);
    }

    #[test]
    fn sweep_purges_long_dead_stories() {
        let conn = test_conn();
        let long_ago = (Utc::now() - Duration::hours(STORY_TTL_HOURS + 2)).to_rfc3339();
        insert_story(&conn, "s-old", &long_ago, 0);

        let (_, purged) = sweep_expired(&conn).unwrap();
        assert_eq!(purged, 1);

        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM stories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
