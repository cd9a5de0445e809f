use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use kindred_db::Database;
use kindred_db::models::ConversationRow;
use kindred_types::models::Conversation;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{CompanionError, store};

/// Finds the conversation a turn belongs to, creating the owner's conversation
/// for today on first use.
#[derive(Clone)]
pub struct ConversationResolver {
    db: Arc<Database>,
    timezone: Tz,
}

impl ConversationResolver {
    pub fn new(db: Arc<Database>, timezone: Tz) -> Self {
        Self { db, timezone }
    }

    /// Calendar date of `now` in the reference timezone.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }

    pub async fn resolve(
        &self,
        owner: &str,
        explicit: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Conversation, CompanionError> {
        match explicit {
            Some(id) => self.resolve_explicit(owner, id).await,
            None => self.resolve_for_date(owner, self.today(now)).await,
        }
    }

    async fn resolve_explicit(&self, owner: &str, id: Uuid) -> Result<Conversation, CompanionError> {
        let row = store::run(&self.db, move |db| db.find_conversation(&id.to_string())).await?;

        // Ownership is checked here even though callers only ever see their own rows
        match row {
            Some(row) if row.user_id == owner => row.into_model().map_err(CompanionError::storage),
            _ => Err(CompanionError::NotFound),
        }
    }

    async fn resolve_for_date(&self, owner: &str, date: NaiveDate) -> Result<Conversation, CompanionError> {
        let date = date.format("%Y-%m-%d").to_string();

        if let Some(existing) = self.find_for_date(owner, &date).await? {
            return Ok(existing);
        }

        let new_id = Uuid::new_v4().to_string();
        let created = {
            let (id, owner, date) = (new_id.clone(), owner.to_string(), date.clone());
            store::run(&self.db, move |db| db.insert_conversation_if_absent(&id, &owner, &date)).await?
        };

        if created {
            info!(owner, conversation_id = %new_id, date = %date, "Created conversation");
        } else {
            // A concurrent first message won the unique (owner, date) slot; use its row.
            debug!(owner, date = %date, "Conversation created concurrently, re-reading");
        }

        self.find_for_date(owner, &date).await?.ok_or_else(|| {
            CompanionError::Storage(anyhow::anyhow!(
                "conversation for {} on {} missing after insert",
                owner,
                date
            ))
        })
    }

    async fn find_for_date(&self, owner: &str, date: &str) -> Result<Option<Conversation>, CompanionError> {
        let (owner, date) = (owner.to_string(), date.to_string());
        store::run(&self.db, move |db| {
            db.find_conversation_for_date(&owner, &date)?
                .map(ConversationRow::into_model)
                .transpose()
        })
        .await
    }
}
