use axum::{extract::State, Json};
use serde::Serialize;

use crate::auth::middleware::Claims;
use crate::db::models::UserSummary;
use crate::db::with_conn;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LastMessage {
    pub id: String,
    pub sender: String,
    pub body: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct ConversationView {
    pub id: String,
    pub other_user: UserSummary,
    pub last_message: Option<LastMessage>,
    pub unread_count: i64,
    pub last_activity: String,
}

/// GET /api/chat/conversations — Every conversation the caller is part of,
/// most recently active first, with the other participant, the last message
/// and how many messages from them are still unread.
pub async fn list_conversations(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<ConversationView>>, ApiError> {
    let me = claims.sub;
    let conversations = with_conn(&state.db, move |conn| {
        let mut stmt = conn.prepare(
            "SELECT c.id, c.last_activity,
                    u.id, u.username, u.full_name, u.profile_picture,
                    m.id, m.sender, m.body, m.created_at,
                    (SELECT COUNT(*) FROM messages mm
                     WHERE mm.recipient = ?1 AND mm.is_read = 0
                       AND mm.sender = CASE WHEN c.participant_a = ?1
                                            THEN c.participant_b ELSE c.participant_a END)
             FROM conversations c
             JOIN users u ON u.id = CASE WHEN c.participant_a = ?1
                                         THEN c.participant_b ELSE c.participant_a END
             LEFT JOIN messages m ON m.id = c.last_message_id
             WHERE c.participant_a = ?1 OR c.participant_b = ?1
             ORDER BY c.last_activity DESC",
        )?;
        let rows: Vec<ConversationView> = stmt
            .query_map(rusqlite::params![me], |row| {
                let last_message = match row.get::<_, Option<String>>(6)? {
                    Some(id) => Some(LastMessage {
                        id,
                        sender: row.get(7)?,
                        body: row.get(8)?,
                        created_at: row.get(9)?,
                    }),
                    None => None,
                };
                Ok(ConversationView {
                    id: row.get(0)?,
                    last_activity: row.get(1)?,
                    other_user: UserSummary {
                        id: row.get(2)?,
                        username: row.get(3)?,
                        full_name: row.get(4)?,
                        profile_picture: row.get(5)?,
                    },
                    last_message,
                    unread_count: row.get(10)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    })
    .await?;
    Ok(Json(conversations))
}
