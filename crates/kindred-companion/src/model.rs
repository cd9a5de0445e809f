use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::prompt::ChatMessage;

/// Sampling temperature for every companion reply.
pub const TEMPERATURE: f32 = 0.7;
/// Output ceiling for every companion reply.
pub const MAX_TOKENS: u32 = 500;
/// Substituted when the service answers without any content.
pub const FALLBACK_REPLY: &str = "I apologize, I had trouble processing that.";

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("completion request failed: {0}")]
    Transport(String),

    #[error("completion service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed completion response: {0}")]
    Malformed(String),
}

/// External chat-completion service.
///
/// `Ok(None)` means the service answered but produced no text.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Option<String>, ModelError>;
}

/// Calls the completion service with the companion's fixed parameters.
#[derive(Clone)]
pub struct ModelClient {
    service: Arc<dyn CompletionService>,
    model: String,
}

impl ModelClient {
    pub fn new(service: Arc<dyn CompletionService>, model: impl Into<String>) -> Self {
        Self { service, model: model.into() }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, ModelError> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };
        debug!(model = %self.model, messages = request.messages.len(), "Requesting completion");

        match self.service.complete(request).await? {
            Some(text) if !text.is_empty() => Ok(text),
            _ => {
                warn!(model = %self.model, "Completion returned no content, using fallback reply");
                Ok(FALLBACK_REPLY.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::PromptRole;
    use crate::testing::ScriptedCompletion;

    fn prompt() -> Vec<ChatMessage> {
        vec![
            ChatMessage::new(PromptRole::System, "Be kind."),
            ChatMessage::new(PromptRole::User, "Hello"),
        ]
    }

    #[tokio::test]
    async fn sends_fixed_parameters() {
        let service = Arc::new(ScriptedCompletion::new().with_reply("Hi there"));
        let client = ModelClient::new(service.clone(), "llama-3.1-8b-instant");

        assert_eq!(client.complete(prompt()).await.unwrap(), "Hi there");

        let calls = service.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model, "llama-3.1-8b-instant");
        assert_eq!(calls[0].temperature, 0.7);
        assert_eq!(calls[0].max_tokens, 500);
        assert_eq!(calls[0].messages, prompt());
    }

    #[tokio::test]
    async fn empty_content_falls_back() {
        let service = Arc::new(ScriptedCompletion::new().with_empty().with_reply(""));
        let client = ModelClient::new(service, "m");

        assert_eq!(client.complete(prompt()).await.unwrap(), FALLBACK_REPLY);
        assert_eq!(client.complete(prompt()).await.unwrap(), FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn service_failure_propagates() {
        let service = Arc::new(ScriptedCompletion::new().with_failure("connection reset"));
        let client = ModelClient::new(service, "m");

        let err = client.complete(prompt()).await.unwrap_err();
        assert!(matches!(err, ModelError::Transport(_)));
    }
}
