//! Versioned behavioural configuration: the persona prompt and the crisis
//! keyword list. Loaded once at startup; the built-in policy is used when no
//! file is configured.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::info;

pub const BUILTIN_POLICY_VERSION: u32 = 1;

pub const DEFAULT_PERSONA: &str = "You are an empathetic AI healthcare companion. Your role is to provide emotional support and companionship to people dealing with chronic illness. 

IMPORTANT CONSTRAINTS:
- You are NOT a medical professional
- You do NOT provide medical advice, diagnosis, or treatment recommendations
- You do NOT replace therapy or professional mental health care
- You are a companion who listens with empathy
- Keep responses concise (2-4 sentences maximum)
- Be warm, empathetic, and conversational
- Focus on emotional support and companionship
- If someone mentions crisis or self-harm, acknowledge it but redirect to professional help

FORMATTING:
- Use **bold text** (markdown format) to highlight important points, key phrases, or emotional support statements
- Example: \"I understand this is **really difficult** for you right now.\"
- Use bold sparingly - only for 1-2 key phrases per response

Your responses should be:
- Brief and focused (2-4 sentences)
- Warm and empathetic
- Supportive without being medical
- Conversational and natural
- Include **bold highlights** for important emotional support phrases";

pub const DEFAULT_CRISIS_KEYWORDS: &[&str] = &[
    "suicide",
    "kill myself",
    "end my life",
    "want to die",
    "going to die",
    "am going to die",
    "gonna die",
    "will die",
    "not worth living",
    "better off dead",
    "harm myself",
    "self harm",
    "hurt myself",
    "overdose",
    "cut myself",
    "jump off",
    "hang myself",
    "end it all",
    "give up",
    "no point living",
    "nothing to live for",
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Policy {
    pub version: u32,
    pub persona: String,
    pub crisis_keywords: Vec<String>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            version: BUILTIN_POLICY_VERSION,
            persona: DEFAULT_PERSONA.to_string(),
            crisis_keywords: DEFAULT_CRISIS_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl Policy {
    pub fn from_toml(raw: &str) -> Result<Self> {
        let policy: Policy = toml::from_str(raw).context("Invalid policy file")?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read policy file {}", path.display()))?;
        let policy = Self::from_toml(&raw)?;
        info!(
            version = policy.version,
            keywords = policy.crisis_keywords.len(),
            "Loaded policy from {}",
            path.display()
        );
        Ok(policy)
    }

    /// Built-in policy unless a file path is configured.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.persona.trim().is_empty() {
            bail!("Policy v{} has an empty persona", self.version);
        }
        if self.crisis_keywords.is_empty() {
            bail!("Policy v{} has no crisis keywords", self.version);
        }
        if self.crisis_keywords.iter().any(|k| k.trim().is_empty()) {
            bail!("Policy v{} contains a blank crisis keyword", self.version);
        }
        Ok(())
    }
}
