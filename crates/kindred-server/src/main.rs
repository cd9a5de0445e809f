mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use kindred_api::state::{AppState, AppStateInner};
use kindred_companion::clock::{Clock, SystemClock};
use kindred_companion::conversations::ConversationDirectory;
use kindred_companion::groq::GroqClient;
use kindred_companion::model::ModelClient;
use kindred_companion::policy::Policy;
use kindred_companion::transcribe::{DeepgramClient, Transcriber};
use kindred_companion::turn::TurnOrchestrator;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kindred=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    let policy = Policy::load_or_default(config.policy_path.as_deref())?;
    info!(
        policy_version = policy.version,
        timezone = %config.timezone,
        model = %config.model,
        "Configuration loaded"
    );

    // Init database
    let db = Arc::new(kindred_db::Database::open(&config.db_path)?);

    let completion = Arc::new(GroqClient::new(&config.groq_api_key, &config.groq_base_url)?);
    let model = ModelClient::new(completion, &config.model);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let transcriber: Option<Arc<dyn Transcriber>> = match &config.deepgram_api_key {
        Some(key) => Some(Arc::new(DeepgramClient::new(key)?)),
        None => {
            warn!("DEEPGRAM_API_KEY not set, /transcribe is disabled");
            None
        }
    };

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        turns: TurnOrchestrator::new(db.clone(), &policy, config.timezone, model, clock.clone()),
        conversations: ConversationDirectory::new(db, config.timezone, clock),
        transcriber,
        jwt_secret: config.jwt_secret.clone(),
    });

    let app = kindred_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Kindred server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
