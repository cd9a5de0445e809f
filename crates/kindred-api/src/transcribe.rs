use axum::{
    Extension, Json,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, header},
};
use bytes::Bytes;
use kindred_companion::audio::{estimate_volume, extract_audio_features};
use kindred_types::api::{Claims, TranscribeQuery, TranscribeResponse};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// 25 MB upload limit for recordings
pub const MAX_AUDIO_SIZE: usize = 25 * 1024 * 1024;

/// POST /transcribe — accepts a raw audio body and returns its transcript.
pub async fn transcribe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    query: Result<Query<TranscribeQuery>, QueryRejection>,
    headers: HeaderMap,
    audio: Bytes,
) -> Result<Json<TranscribeResponse>, ApiError> {
    let Query(query) = query?;
    let transcriber = state.transcriber.as_ref().ok_or(ApiError::TranscriptionDisabled)?;

    if audio.is_empty() {
        return Err(ApiError::InvalidRequest("Audio file is required".into()));
    }
    if let Some(duration) = query.duration {
        if !duration.is_finite() || duration < 0.0 {
            return Err(ApiError::InvalidRequest("duration must be a non-negative number of seconds".into()));
        }
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("audio/webm");

    debug!(owner = %claims.sub, bytes = audio.len(), "Transcribing recording");
    let text = transcriber.transcribe(audio, content_type).await?;

    let audio_features = query
        .duration
        .map(|duration| extract_audio_features(&text, duration, estimate_volume(&text)));

    Ok(Json(TranscribeResponse { text, audio_features }))
}
