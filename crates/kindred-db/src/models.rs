//! Database row types. These map directly to SQLite rows and stay distinct
//! from the kindred-types models so the storage layer owns its encoding.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use kindred_types::models::{AudioFeatures, Conversation, CrisisFlag, Message, Role};
use uuid::Uuid;

#[derive(Debug)]
pub struct ConversationRow {
    pub id: String,
    pub user_id: String,
    pub date: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug)]
pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub role: String,
    pub content: String,
    pub audio_volume: Option<f64>,
    pub audio_pace: Option<f64>,
    pub audio_pause_count: Option<i64>,
    pub created_at: String,
}

#[derive(Debug)]
pub struct CrisisFlagRow {
    pub id: String,
    pub user_id: String,
    pub keywords: String,
    pub created_at: String,
}

/// A message about to be appended. The storage layer assigns `created_at`.
pub struct NewMessage<'a> {
    pub id: &'a str,
    pub conversation_id: &'a str,
    pub role: Role,
    pub content: &'a str,
    pub audio: Option<AudioFeatures>,
}

impl ConversationRow {
    pub fn into_model(self) -> Result<Conversation> {
        Ok(Conversation {
            id: parse_uuid(&self.id)?,
            date: NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
                .with_context(|| format!("Corrupt date '{}' on conversation '{}'", self.date, self.id))?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            user_id: self.user_id,
        })
    }
}

impl MessageRow {
    pub fn into_model(self) -> Result<Message> {
        // Audio features are written all-or-nothing
        let audio_features = match (self.audio_volume, self.audio_pace, self.audio_pause_count) {
            (Some(volume), Some(pace), Some(pause_count)) => Some(AudioFeatures {
                volume,
                pace,
                pause_count: u32::try_from(pause_count)
                    .with_context(|| format!("Corrupt pause count on message '{}'", self.id))?,
            }),
            _ => None,
        };

        Ok(Message {
            id: parse_uuid(&self.id)?,
            conversation_id: parse_uuid(&self.conversation_id)?,
            role: self.role.parse()?,
            content: self.content,
            audio_features,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl CrisisFlagRow {
    pub fn into_model(self) -> Result<CrisisFlag> {
        Ok(CrisisFlag {
            id: parse_uuid(&self.id)?,
            keywords: serde_json::from_str(&self.keywords)
                .with_context(|| format!("Corrupt keyword list on crisis flag '{}'", self.id))?,
            created_at: parse_timestamp(&self.created_at)?,
            user_id: self.user_id,
        })
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("Corrupt id '{}'", raw))
}

/// Accepts RFC 3339 and SQLite's bare "YYYY-MM-DD HH:MM:SS" (naive UTC).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .with_context(|| format!("Corrupt timestamp '{}'", raw))
}
