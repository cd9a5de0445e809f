use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kindred_companion::CompanionError;
use kindred_companion::transcribe::TranscriptionError;
use kindred_types::api::ErrorBody;
use thiserror::Error;
use tracing::error;

/// Every failure the HTTP surface reports, each with a stable status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized - please sign in again")]
    Unauthorized,

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Conversation not found")]
    NotFound,

    #[error("Database tables not found. Run the migrations before serving traffic.")]
    SchemaMissing,

    #[error("Something went wrong saving your conversation. Please try again.")]
    Storage,

    #[error("The companion is unavailable right now. Your message was saved, please try again.")]
    ModelUnavailable,

    #[error("No speech detected in audio")]
    NoSpeech,

    #[error("Transcription failed. Please try again.")]
    TranscriptionFailed,

    #[error("Transcription is not configured on this server")]
    TranscriptionDisabled,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidRequest(_) | Self::NoSpeech => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::SchemaMissing | Self::Storage => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ModelUnavailable | Self::TranscriptionFailed => StatusCode::BAD_GATEWAY,
            Self::TranscriptionDisabled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<CompanionError> for ApiError {
    fn from(err: CompanionError) -> Self {
        match err {
            CompanionError::InvalidRequest(msg) => Self::InvalidRequest(msg),
            CompanionError::NotFound => Self::NotFound,
            CompanionError::Forbidden => Self::Forbidden,
            CompanionError::SchemaMissing => {
                error!("Database schema is missing");
                Self::SchemaMissing
            }
            CompanionError::Storage(e) => {
                error!("Storage error: {:#}", e);
                Self::Storage
            }
            CompanionError::ModelUnavailable(e) => {
                error!("Model error: {}", e);
                Self::ModelUnavailable
            }
        }
    }
}

impl From<TranscriptionError> for ApiError {
    fn from(err: TranscriptionError) -> Self {
        match err {
            TranscriptionError::NoSpeech => Self::NoSpeech,
            TranscriptionError::Service(e) => {
                error!("Transcription error: {}", e);
                Self::TranscriptionFailed
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.to_string() };
        (self.status(), Json(body)).into_response()
    }
}
