use crate::Database;
use crate::models::{ConversationRow, CrisisFlagRow, MessageRow, NewMessage};
use anyhow::Result;
use rusqlite::{Connection, Row};

const CONVERSATION_COLUMNS: &str = "id, user_id, date, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, conversation_id, role, content, audio_volume, audio_pace, audio_pause_count, created_at";

impl Database {
    // -- Conversations --

    pub fn find_conversation(&self, id: &str) -> Result<Option<ConversationRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1");
            let row = conn.query_row(&sql, [id], conversation_from_row).optional()?;
            Ok(row)
        })
    }

    pub fn find_conversation_for_date(&self, user_id: &str, date: &str) -> Result<Option<ConversationRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE user_id = ?1 AND date = ?2"
            );
            let row = conn.query_row(&sql, [user_id, date], conversation_from_row).optional()?;
            Ok(row)
        })
    }

    /// Inserts the (user, date) conversation unless one already exists.
    /// Returns true if this call created the row.
    pub fn insert_conversation_if_absent(&self, id: &str, user_id: &str, date: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO conversations (id, user_id, date) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id, date) DO NOTHING",
                (id, user_id, date),
            )?;
            Ok(inserted == 1)
        })
    }

    /// Most recent conversations by date, newest first.
    pub fn list_conversations(&self, user_id: &str, limit: u32) -> Result<Vec<ConversationRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations
                 WHERE user_id = ?1
                 ORDER BY date DESC
                 LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], conversation_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Deletes a conversation and, through the foreign key cascade, its messages.
    /// Returns false if no such conversation existed.
    pub fn delete_conversation(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM conversations WHERE id = ?1", [id])?;
            Ok(deleted == 1)
        })
    }

    // -- Messages --

    /// Appends a message and bumps the parent conversation's `updated_at`.
    /// Returns the stored row including its storage-assigned timestamp.
    pub fn insert_message(&self, msg: &NewMessage<'_>) -> Result<MessageRow> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            let (volume, pace, pauses) = match msg.audio {
                Some(a) => (Some(a.volume), Some(a.pace), Some(i64::from(a.pause_count))),
                None => (None, None, None),
            };

            let sql = format!(
                "INSERT INTO messages (id, conversation_id, role, content, audio_volume, audio_pace, audio_pause_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 RETURNING {MESSAGE_COLUMNS}"
            );
            let row = tx.query_row(
                &sql,
                rusqlite::params![
                    msg.id,
                    msg.conversation_id,
                    msg.role.as_str(),
                    msg.content,
                    volume,
                    pace,
                    pauses
                ],
                message_from_row,
            )?;

            tx.execute(
                "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
                (&row.created_at, msg.conversation_id),
            )?;

            tx.commit()?;
            Ok(row)
        })
    }

    /// The `limit` most recent messages of a conversation, oldest first.
    pub fn recent_messages(&self, conversation_id: &str, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            // rowid breaks ties between messages stored in the same millisecond
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM (
                     SELECT rowid AS seq, {MESSAGE_COLUMNS} FROM messages
                     WHERE conversation_id = ?1
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT ?2
                 )
                 ORDER BY created_at ASC, seq ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![conversation_id, limit], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Every message of a conversation, oldest first.
    pub fn all_messages(&self, conversation_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_all_messages(conn, conversation_id))
    }

    // -- Crisis flags --

    pub fn insert_crisis_flag(&self, id: &str, user_id: &str, keywords: &[String]) -> Result<()> {
        let encoded = serde_json::to_string(keywords)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO crisis_flags (id, user_id, keywords) VALUES (?1, ?2, ?3)",
                (id, user_id, &encoded),
            )?;
            Ok(())
        })
    }

    /// Crisis flags for a user, oldest first. Audit tooling only.
    pub fn crisis_flags_for_user(&self, user_id: &str) -> Result<Vec<CrisisFlagRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, keywords, created_at FROM crisis_flags
                 WHERE user_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(CrisisFlagRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        keywords: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_all_messages(conn: &Connection, conversation_id: &str) -> Result<Vec<MessageRow>> {
    let sql = format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages
         WHERE conversation_id = ?1
         ORDER BY created_at ASC, rowid ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([conversation_id], message_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        date: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        role: row.get(2)?,
        content: row.get(3)?,
        audio_volume: row.get(4)?,
        audio_pace: row.get(5)?,
        audio_pause_count: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
