//! Turn orchestration.
//!
//! A turn moves through
//! `AwaitingInput → Screening → Resolving → PersistingUser → BuildingContext
//! → Completing → PersistingAssistant → Done`, or stops at `CrisisHalt` when
//! screening matches. The user message is committed before the model is
//! called and is never rolled back: a failed completion leaves it in history
//! so a retry sees it.

use std::fmt;
use std::sync::Arc;

use chrono_tz::Tz;
use kindred_db::Database;
use kindred_db::models::NewMessage;
use kindred_types::models::{AudioFeatures, Message, Role};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::crisis::CrisisScreener;
use crate::history::{HISTORY_LIMIT, HistoryLoader};
use crate::model::ModelClient;
use crate::policy::Policy;
use crate::prompt::PromptBuilder;
use crate::resolver::ConversationResolver;
use crate::{CompanionError, store};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    AwaitingInput,
    Screening,
    CrisisHalt,
    Resolving,
    PersistingUser,
    BuildingContext,
    Completing,
    PersistingAssistant,
    Done,
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AwaitingInput => "awaiting_input",
            Self::Screening => "screening",
            Self::CrisisHalt => "crisis_halt",
            Self::Resolving => "resolving",
            Self::PersistingUser => "persisting_user",
            Self::BuildingContext => "building_context",
            Self::Completing => "completing",
            Self::PersistingAssistant => "persisting_assistant",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub message: String,
    pub conversation_id: Option<Uuid>,
    pub audio_features: Option<AudioFeatures>,
}

impl TurnRequest {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            conversation_id: None,
            audio_features: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TurnOutcome {
    Reply {
        conversation_id: Uuid,
        user_message: Message,
        reply: Message,
    },
    /// Screening matched. Nothing was persisted except the audit flag.
    CrisisHalt { keywords: Vec<String> },
}

pub struct TurnOrchestrator {
    db: Arc<Database>,
    screener: CrisisScreener,
    resolver: ConversationResolver,
    history: HistoryLoader,
    prompt: PromptBuilder,
    model: ModelClient,
    clock: Arc<dyn Clock>,
}

impl TurnOrchestrator {
    pub fn new(
        db: Arc<Database>,
        policy: &Policy,
        timezone: Tz,
        model: ModelClient,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            screener: CrisisScreener::new(policy.crisis_keywords.iter().cloned()),
            resolver: ConversationResolver::new(db.clone(), timezone),
            history: HistoryLoader::new(db.clone()),
            prompt: PromptBuilder::new(policy.persona.clone()),
            model,
            clock,
            db,
        }
    }

    pub async fn handle(&self, owner: &str, request: TurnRequest) -> Result<TurnOutcome, CompanionError> {
        validate(&request).map_err(|e| failed(TurnStage::AwaitingInput, owner, e))?;

        let screening = self.screener.screen(&request.message);
        debug!(owner, stage = %TurnStage::Screening, detected = screening.detected, "Screened message");
        if screening.detected {
            return self.halt(owner, screening.keywords).await;
        }

        let conversation = self
            .resolver
            .resolve(owner, request.conversation_id, self.clock.now())
            .await
            .map_err(|e| failed(TurnStage::Resolving, owner, e))?;

        let user_message = self
            .append(conversation.id, Role::User, request.message, request.audio_features)
            .await
            .map_err(|e| failed(TurnStage::PersistingUser, owner, e))?;

        let history = self
            .history
            .load_recent(conversation.id, HISTORY_LIMIT)
            .await
            .map_err(|e| failed(TurnStage::BuildingContext, owner, e))?;
        let prompt = self.prompt.build(&history);
        debug!(
            owner,
            stage = %TurnStage::Completing,
            model = self.model.model(),
            window = history.len(),
            "Requesting completion"
        );

        let text = self
            .model
            .complete(prompt)
            .await
            .map_err(|e| failed(TurnStage::Completing, owner, e.into()))?;

        let reply = self
            .append(conversation.id, Role::Assistant, text, None)
            .await
            .map_err(|e| failed(TurnStage::PersistingAssistant, owner, e))?;

        debug!(owner, conversation_id = %conversation.id, stage = %TurnStage::Done, "Turn complete");
        Ok(TurnOutcome::Reply {
            conversation_id: conversation.id,
            user_message,
            reply,
        })
    }

    async fn halt(&self, owner: &str, keywords: Vec<String>) -> Result<TurnOutcome, CompanionError> {
        // The message text is intentionally neither logged nor stored
        warn!(owner, keywords = ?keywords, stage = %TurnStage::CrisisHalt, "Crisis language detected, turn halted");

        let (id, user, flagged) = (Uuid::new_v4().to_string(), owner.to_string(), keywords.clone());
        store::run(&self.db, move |db| db.insert_crisis_flag(&id, &user, &flagged))
            .await
            .map_err(|e| failed(TurnStage::CrisisHalt, owner, e))?;

        Ok(TurnOutcome::CrisisHalt { keywords })
    }

    async fn append(
        &self,
        conversation_id: Uuid,
        role: Role,
        content: String,
        audio: Option<AudioFeatures>,
    ) -> Result<Message, CompanionError> {
        let message = store::run(&self.db, move |db| {
            db.insert_message(&NewMessage {
                id: &Uuid::new_v4().to_string(),
                conversation_id: &conversation_id.to_string(),
                role,
                content: &content,
                audio,
            })?
            .into_model()
        })
        .await?;

        info!(conversation_id = %conversation_id, message_id = %message.id, role = %role, "Stored message");
        Ok(message)
    }
}

fn validate(request: &TurnRequest) -> Result<(), CompanionError> {
    if request.message.trim().is_empty() {
        return Err(CompanionError::InvalidRequest("Message is required".into()));
    }
    if let Some(audio) = &request.audio_features {
        audio.validate().map_err(CompanionError::InvalidRequest)?;
    }
    Ok(())
}

fn failed(stage: TurnStage, owner: &str, err: CompanionError) -> CompanionError {
    warn!(owner, stage = %stage, error = %err, "Turn failed");
    err
}
