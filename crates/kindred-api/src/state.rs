use std::sync::Arc;

use kindred_companion::conversations::ConversationDirectory;
use kindred_companion::transcribe::Transcriber;
use kindred_companion::turn::TurnOrchestrator;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub turns: TurnOrchestrator,
    pub conversations: ConversationDirectory,
    /// `None` when no speech-to-text key is configured.
    pub transcriber: Option<Arc<dyn Transcriber>>,
    pub jwt_secret: String,
}
