use std::sync::Arc;

use kindred_db::Database;
use kindred_db::models::MessageRow;
use kindred_types::models::Message;
use uuid::Uuid;

use crate::{CompanionError, store};

/// Messages of context handed to the model per turn.
pub const HISTORY_LIMIT: u32 = 20;

#[derive(Clone)]
pub struct HistoryLoader {
    db: Arc<Database>,
}

impl HistoryLoader {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// The `limit` most recent messages, oldest first.
    pub async fn load_recent(&self, conversation_id: Uuid, limit: u32) -> Result<Vec<Message>, CompanionError> {
        store::run(&self.db, move |db| {
            db.recent_messages(&conversation_id.to_string(), limit)?
                .into_iter()
                .map(MessageRow::into_model)
                .collect()
        })
        .await
    }

    /// The full transcript, oldest first.
    pub async fn load_all(&self, conversation_id: Uuid) -> Result<Vec<Message>, CompanionError> {
        store::run(&self.db, move |db| {
            db.all_messages(&conversation_id.to_string())?
                .into_iter()
                .map(MessageRow::into_model)
                .collect()
        })
        .await
    }
}
