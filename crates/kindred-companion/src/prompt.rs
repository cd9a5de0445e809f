use kindred_types::models::{Message, Role};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

impl From<Role> for PromptRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Self::User,
            Role::Assistant => Self::Assistant,
        }
    }
}

/// One entry of a model-ready message sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: PromptRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: PromptRole, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

/// Prepends the fixed persona to the windowed history.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    persona: String,
}

impl PromptBuilder {
    pub fn new(persona: impl Into<String>) -> Self {
        Self { persona: persona.into() }
    }

    pub fn build(&self, history: &[Message]) -> Vec<ChatMessage> {
        std::iter::once(ChatMessage::new(PromptRole::System, self.persona.as_str()))
            .chain(
                history
                    .iter()
                    .map(|m| ChatMessage::new(m.role.into(), m.content.as_str())),
            )
            .collect()
    }
}
