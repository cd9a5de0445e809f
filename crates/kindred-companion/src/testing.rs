//! In-process doubles for the external collaborators.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::model::{CompletionRequest, CompletionService, ModelError};
use crate::transcribe::{Transcriber, TranscriptionError};

/// Completion service that replays queued outcomes and records every request.
#[derive(Default)]
pub struct ScriptedCompletion {
    outcomes: Mutex<VecDeque<Result<Option<String>, ModelError>>>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(Some(text.into())))
    }

    /// Service answers without content.
    pub fn with_empty(self) -> Self {
        self.push(Ok(None))
    }

    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.push(Err(ModelError::Transport(message.into())))
    }

    fn push(self, outcome: Result<Option<String>, ModelError>) -> Self {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.push_back(outcome);
        }
        self
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<Option<String>, ModelError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request);
        }
        self.outcomes
            .lock()
            .ok()
            .and_then(|mut o| o.pop_front())
            .unwrap_or_else(|| Err(ModelError::Transport("no scripted response left".into())))
    }
}

/// Transcriber that returns a fixed transcript (empty means no speech).
pub struct StaticTranscriber(pub String);

#[async_trait]
impl Transcriber for StaticTranscriber {
    async fn transcribe(&self, _audio: Bytes, _content_type: &str) -> Result<String, TranscriptionError> {
        if self.0.is_empty() {
            Err(TranscriptionError::NoSpeech)
        } else {
            Ok(self.0.clone())
        }
    }
}
