use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Author of a stored message. System prompts are never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown message role '{0}'")]
pub struct UnknownRole(pub String);

/// Prosody measurements attached to voice-originated user messages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFeatures {
    /// Average input level, 0.0 (silent) to 1.0 (clipping).
    pub volume: f64,
    /// Words per minute.
    pub pace: f64,
    pub pause_count: u32,
}

impl AudioFeatures {
    /// Rejects values outside the ranges the capture side can produce.
    pub fn validate(&self) -> Result<(), String> {
        if !self.volume.is_finite() || !(0.0..=1.0).contains(&self.volume) {
            return Err(format!("audio volume must be within [0, 1], got {}", self.volume));
        }
        if !self.pace.is_finite() || self.pace < 0.0 {
            return Err(format!("audio pace must be a non-negative number, got {}", self.pace));
        }
        Ok(())
    }
}

/// One calendar-day chat session. At most one exists per (owner, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An immutable chat message. Ordered by `created_at` within its conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_features: Option<AudioFeatures>,
    pub created_at: DateTime<Utc>,
}

/// Audit record for a message that tripped crisis screening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrisisFlag {
    pub id: Uuid,
    pub user_id: String,
    pub keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_stored_values() {
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert_eq!("assistant".parse::<Role>().unwrap(), Role::Assistant);
        let err = "system".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "unknown message role 'system'");
    }

    #[test]
    fn audio_features_use_camel_case() {
        let features: AudioFeatures =
            serde_json::from_str(r#"{"volume":0.4,"pace":120,"pauseCount":3}"#).unwrap();
        assert_eq!(features.pause_count, 3);
        assert!(features.validate().is_ok());
    }

    #[test]
    fn out_of_range_volume_is_rejected() {
        let features = AudioFeatures { volume: 1.5, pace: 100.0, pause_count: 0 };
        assert!(features.validate().is_err());

        let features = AudioFeatures { volume: 0.5, pace: -1.0, pause_count: 0 };
        assert!(features.validate().is_err());
    }
}
