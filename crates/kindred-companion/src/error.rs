use thiserror::Error;

use crate::model::ModelError;

/// Failure of a pipeline operation. Crisis detection is not an error.
#[derive(Debug, Error)]
pub enum CompanionError {
    #[error("{0}")]
    InvalidRequest(String),

    /// Conversation absent, or present but owned by someone else.
    #[error("Conversation not found")]
    NotFound,

    /// Conversation exists and belongs to another user (delete only).
    #[error("Conversation belongs to another user")]
    Forbidden,

    #[error("Database tables not found. Run the migrations before serving traffic.")]
    SchemaMissing,

    #[error("Storage failure: {0:#}")]
    Storage(anyhow::Error),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(#[from] ModelError),
}

impl CompanionError {
    /// Wraps a storage-layer error, singling out an unprovisioned schema.
    pub fn storage(err: anyhow::Error) -> Self {
        if kindred_db::is_schema_missing(&err) {
            Self::SchemaMissing
        } else {
            Self::Storage(err)
        }
    }
}
