pub mod chat;
pub mod conversations;
pub mod error;
pub mod middleware;
pub mod state;
pub mod transcribe;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use serde_json::{Value, json};

use crate::middleware::require_auth;
use crate::state::AppState;

/// All routes. Everything except `/health` requires a bearer token.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(health));

    let protected_routes = Router::new()
        .route("/chat", get(chat::get_history).post(chat::send_turn))
        .route(
            "/conversations",
            get(conversations::list_conversations).delete(conversations::delete_conversation),
        )
        .route(
            "/transcribe",
            post(transcribe::transcribe).layer(DefaultBodyLimit::max(transcribe::MAX_AUDIO_SIZE)),
        )
        .layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use chrono::{TimeZone, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use kindred_companion::clock::{Clock, FixedClock};
    use kindred_companion::conversations::ConversationDirectory;
    use kindred_companion::groq::DEFAULT_MODEL;
    use kindred_companion::model::ModelClient;
    use kindred_companion::policy::Policy;
    use kindred_companion::testing::{ScriptedCompletion, StaticTranscriber};
    use kindred_companion::transcribe::Transcriber;
    use kindred_companion::turn::TurnOrchestrator;
    use kindred_db::Database;
    use kindred_types::api::Claims;
    use tower::ServiceExt;

    use super::*;
    use crate::state::AppStateInner;

    const SECRET: &str = "test-secret";

    fn app_with(service: ScriptedCompletion, transcript: Option<&str>) -> Router {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()));
        let model = ModelClient::new(Arc::new(service), DEFAULT_MODEL);

        let state = Arc::new(AppStateInner {
            turns: TurnOrchestrator::new(db.clone(), &Policy::default(), chrono_tz::UTC, model, clock.clone()),
            conversations: ConversationDirectory::new(db, chrono_tz::UTC, clock),
            transcriber: transcript.map(|t| Arc::new(StaticTranscriber(t.to_string())) as Arc<dyn Transcriber>),
            jwt_secret: SECRET.to_string(),
        });
        router(state)
    }

    fn app(service: ScriptedCompletion) -> Router {
        app_with(service, None)
    }

    fn token_for(sub: &str, secret: &str) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp: (Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn token(sub: &str) -> String {
        token_for(sub, SECRET)
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = app(ScriptedCompletion::new());
        let (status, body) = call(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn missing_or_forged_token_is_rejected() {
        let app = app(ScriptedCompletion::new());

        let (status, body) = call(&app, Method::GET, "/chat", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].as_str().unwrap().contains("sign in"));

        let forged = token_for("alice", "not-the-secret");
        let (status, _) = call(&app, Method::GET, "/conversations", Some(&forged), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn turn_returns_assistant_reply() {
        let app = app(ScriptedCompletion::new().with_reply("I'm **here for you**."));
        let alice = token("alice");

        let (status, body) =
            call(&app, Method::POST, "/chat", Some(&alice), Some(json!({ "message": "Hello" }))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["crisis"], false);
        assert_eq!(body["message"]["role"], "assistant");
        assert_eq!(body["message"]["content"], "I'm **here for you**.");
        assert!(body.get("keywords").is_none());
    }

    #[tokio::test]
    async fn blank_conversation_id_uses_todays_conversation() {
        let app = app(ScriptedCompletion::new().with_reply("Good morning."));
        let alice = token("alice");

        let (status, body) = call(
            &app,
            Method::POST,
            "/chat",
            Some(&alice),
            Some(json!({ "message": "Morning", "conversationId": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, history) = call(&app, Method::GET, "/chat?conversationId=", Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history["conversationId"], body["message"]["conversationId"]);
        assert_eq!(history["messages"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn crisis_turn_returns_keywords_and_resources() {
        let app = app(ScriptedCompletion::new());
        let alice = token("alice");

        let (status, body) = call(
            &app,
            Method::POST,
            "/chat",
            Some(&alice),
            Some(json!({ "message": "I want to end my life" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["crisis"], true);
        assert_eq!(body["keywords"], json!(["end my life"]));
        assert!(body.get("message").is_none());
        assert!(body["resources"].as_array().unwrap().len() >= 3);

        let (_, history) = call(&app, Method::GET, "/chat", Some(&alice), None).await;
        assert_eq!(history["messages"], json!([]));
    }

    #[tokio::test]
    async fn malformed_turn_bodies_are_bad_requests() {
        let app = app(ScriptedCompletion::new());
        let alice = token("alice");

        for body in [json!({}), json!({ "message": 42 }), json!({ "message": "" })] {
            let (status, body) = call(&app, Method::POST, "/chat", Some(&alice), Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn history_follows_turns_and_hides_foreign_conversations() {
        let app = app(ScriptedCompletion::new().with_reply("Nice to meet you."));
        let alice = token("alice");

        call(
            &app,
            Method::POST,
            "/chat",
            Some(&alice),
            Some(json!({ "message": "Hello", "audioFeatures": { "volume": 0.5, "pace": 110, "pauseCount": 2 } })),
        )
        .await;

        let (status, history) = call(&app, Method::GET, "/chat", Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        let messages = history["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["content"], "Hello");
        assert_eq!(messages[0]["audioFeatures"]["pauseCount"], 2);
        assert_eq!(messages[1]["role"], "assistant");

        let conversation_id = history["conversationId"].as_str().unwrap().to_string();
        let uri = format!("/chat?conversationId={conversation_id}");
        let (status, _) = call(&app, Method::GET, &uri, Some(&token("mallory")), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, Method::GET, "/chat?conversationId=not-a-uuid", Some(&alice), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn model_outage_is_bad_gateway_but_message_is_kept() {
        let app = app(ScriptedCompletion::new().with_failure("timeout"));
        let alice = token("alice");

        let (status, body) =
            call(&app, Method::POST, "/chat", Some(&alice), Some(json!({ "message": "Hello" }))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("try again"));

        let (_, history) = call(&app, Method::GET, "/chat", Some(&alice), None).await;
        assert_eq!(history["messages"][0]["content"], "Hello");
        assert_eq!(history["messages"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn conversations_can_be_listed_and_deleted_by_owner_only() {
        let app = app(ScriptedCompletion::new().with_reply("hi"));
        let alice = token("alice");
        let mallory = token("mallory");

        call(&app, Method::POST, "/chat", Some(&alice), Some(json!({ "message": "Hello" }))).await;

        let (status, list) = call(&app, Method::GET, "/conversations", Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        let conversations = list["conversations"].as_array().unwrap();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0]["date"], "2024-01-01");
        let id = conversations[0]["id"].clone();

        let (_, others) = call(&app, Method::GET, "/conversations", Some(&mallory), None).await;
        assert_eq!(others["conversations"], json!([]));

        let body = json!({ "conversationId": id });
        let (status, _) = call(&app, Method::DELETE, "/conversations", Some(&mallory), Some(body.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, deleted) = call(&app, Method::DELETE, "/conversations", Some(&alice), Some(body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["success"], true);

        let (status, _) = call(&app, Method::DELETE, "/conversations", Some(&alice), Some(body)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, Method::DELETE, "/conversations", Some(&alice), Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    async fn post_audio(app: &Router, token: &str, audio: &'static [u8]) -> (StatusCode, Value) {
        post_audio_to(app, "/transcribe", token, audio).await
    }

    async fn post_audio_to(app: &Router, uri: &str, token: &str, audio: &'static [u8]) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "audio/webm")
            .body(Body::from(audio))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn transcription_returns_text() {
        let app = app_with(ScriptedCompletion::new(), Some("feeling calmer tonight"));
        let alice = token("alice");

        let (status, body) = post_audio(&app, &alice, b"webm-bytes").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["text"], "feeling calmer tonight");
        assert!(body.get("audioFeatures").is_none());

        let (status, _) = post_audio(&app, &alice, b"").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn transcription_derives_features_from_duration() {
        let app = app_with(ScriptedCompletion::new(), Some("I slept badly. The pain is back today"));
        let alice = token("alice");

        let (status, body) = post_audio_to(&app, "/transcribe?duration=4", &alice, b"webm-bytes").await;
        assert_eq!(status, StatusCode::OK);
        let features = &body["audioFeatures"];
        assert_eq!(features["pace"], 120.0);
        assert_eq!(features["pauseCount"], 1);
        assert_eq!(features["volume"], 0.37);

        let (status, _) = post_audio_to(&app, "/transcribe?duration=-1", &alice, b"webm-bytes").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn transcription_errors_are_reported() {
        let silent = app_with(ScriptedCompletion::new(), Some(""));
        let (status, body) = post_audio(&silent, &token("alice"), b"silence").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No speech detected in audio");

        let disabled = app(ScriptedCompletion::new());
        let (status, _) = post_audio(&disabled, &token("alice"), b"audio").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
