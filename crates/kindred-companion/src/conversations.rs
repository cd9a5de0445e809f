use std::sync::Arc;

use chrono_tz::Tz;
use kindred_db::Database;
use kindred_db::models::ConversationRow;
use kindred_types::models::{Conversation, Message};
use tracing::info;
use uuid::Uuid;

use crate::clock::Clock;
use crate::history::HistoryLoader;
use crate::resolver::ConversationResolver;
use crate::{CompanionError, store};

/// Conversations shown in the sidebar list.
pub const LIST_LIMIT: u32 = 30;

/// Read and delete access to a user's conversations outside of a turn.
pub struct ConversationDirectory {
    db: Arc<Database>,
    resolver: ConversationResolver,
    history: HistoryLoader,
    clock: Arc<dyn Clock>,
}

impl ConversationDirectory {
    pub fn new(db: Arc<Database>, timezone: Tz, clock: Arc<dyn Clock>) -> Self {
        Self {
            resolver: ConversationResolver::new(db.clone(), timezone),
            history: HistoryLoader::new(db.clone()),
            clock,
            db,
        }
    }

    /// Full transcript of the given conversation, or of today's conversation
    /// (created if needed) when no id is given.
    pub async fn transcript(
        &self,
        owner: &str,
        conversation_id: Option<Uuid>,
    ) -> Result<(Conversation, Vec<Message>), CompanionError> {
        let conversation = self.resolver.resolve(owner, conversation_id, self.clock.now()).await?;
        let messages = self.history.load_all(conversation.id).await?;
        Ok((conversation, messages))
    }

    /// Most recent conversations by date, newest first.
    pub async fn list(&self, owner: &str) -> Result<Vec<Conversation>, CompanionError> {
        let owner = owner.to_string();
        store::run(&self.db, move |db| {
            db.list_conversations(&owner, LIST_LIMIT)?
                .into_iter()
                .map(ConversationRow::into_model)
                .collect()
        })
        .await
    }

    /// Deletes a conversation and all of its messages.
    pub async fn delete(&self, owner: &str, conversation_id: Uuid) -> Result<(), CompanionError> {
        let id = conversation_id.to_string();

        let existing = {
            let id = id.clone();
            store::run(&self.db, move |db| db.find_conversation(&id)).await?
        };
        match existing {
            None => return Err(CompanionError::NotFound),
            Some(row) if row.user_id != owner => return Err(CompanionError::Forbidden),
            Some(_) => {}
        }

        let deleted = store::run(&self.db, move |db| db.delete_conversation(&id)).await?;
        if !deleted {
            return Err(CompanionError::NotFound);
        }

        info!(owner, conversation_id = %conversation_id, "Deleted conversation");
        Ok(())
    }
}
