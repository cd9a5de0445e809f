//! Speech-to-text collaborator. The pipeline itself never calls this; the
//! HTTP surface exposes it so voice clients can turn a recording into text
//! before submitting a turn.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error};

const DEEPGRAM_URL: &str = "https://api.deepgram.com/v1";

#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("No speech detected in audio")]
    NoSpeech,

    #[error("Transcription failed: {0}")]
    Service(String),
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: Bytes, content_type: &str) -> Result<String, TranscriptionError>;
}

/// Deepgram pre-recorded transcription (nova-2, English, smart formatting).
pub struct DeepgramClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct ListenResponse {
    results: Option<ListenResults>,
}

#[derive(Deserialize)]
struct ListenResults {
    #[serde(default)]
    channels: Vec<ListenChannel>,
}

#[derive(Deserialize)]
struct ListenChannel {
    #[serde(default)]
    alternatives: Vec<ListenAlternative>,
}

#[derive(Deserialize)]
struct ListenAlternative {
    #[serde(default)]
    transcript: String,
}

impl DeepgramClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, TranscriptionError> {
        Self::with_base_url(api_key, DEEPGRAM_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, TranscriptionError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| TranscriptionError::Service(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl Transcriber for DeepgramClient {
    async fn transcribe(&self, audio: Bytes, content_type: &str) -> Result<String, TranscriptionError> {
        debug!(bytes = audio.len(), content_type, "Sending audio to Deepgram");

        let response = self
            .http
            .post(format!("{}/listen", self.base_url))
            .query(&[
                ("model", "nova-2"),
                ("language", "en"),
                ("smart_format", "true"),
                ("punctuate", "true"),
            ])
            .header(reqwest::header::AUTHORIZATION, format!("Token {}", self.api_key))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(audio)
            .send()
            .await
            .map_err(|e| TranscriptionError::Service(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Deepgram error: {}", body);
            return Err(TranscriptionError::Service(format!("HTTP {}", status.as_u16())));
        }

        let parsed: ListenResponse = response
            .json()
            .await
            .map_err(|e| TranscriptionError::Service(format!("unreadable response: {}", e)))?;

        let transcript = parsed
            .results
            .and_then(|r| r.channels.into_iter().next())
            .and_then(|c| c.alternatives.into_iter().next())
            .map(|a| a.transcript)
            .unwrap_or_default();

        if transcript.trim().is_empty() {
            return Err(TranscriptionError::NoSpeech);
        }
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::HeaderMap, routing::post};
    use serde_json::{Value, json};

    async fn serve(reply: Value) -> String {
        let app = Router::new().route(
            "/listen",
            post(move |headers: HeaderMap| {
                let reply = reply.clone();
                async move {
                    assert_eq!(headers["authorization"], "Token dg-key");
                    Json(reply)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn extracts_first_transcript() {
        let url = serve(json!({
            "results": { "channels": [{ "alternatives": [{ "transcript": "I feel a bit better today." }] }] }
        }))
        .await;
        let client = DeepgramClient::with_base_url("dg-key", url).unwrap();

        let text = client.transcribe(Bytes::from_static(b"fake-audio"), "audio/webm").await.unwrap();
        assert_eq!(text, "I feel a bit better today.");
    }

    #[tokio::test]
    async fn empty_transcript_means_no_speech() {
        let url = serve(json!({
            "results": { "channels": [{ "alternatives": [{ "transcript": "" }] }] }
        }))
        .await;
        let client = DeepgramClient::with_base_url("dg-key", url).unwrap();

        let err = client.transcribe(Bytes::from_static(b"silence"), "audio/webm").await.unwrap_err();
        assert!(matches!(err, TranscriptionError::NoSpeech));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_service_error() {
        let client = DeepgramClient::with_base_url("dg-key", "http://127.0.0.1:9").unwrap();
        let err = client.transcribe(Bytes::from_static(b"x"), "audio/webm").await.unwrap_err();
        assert!(matches!(err, TranscriptionError::Service(_)));
    }
}
