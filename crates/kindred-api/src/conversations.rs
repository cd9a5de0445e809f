use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use kindred_types::api::{
    Claims, ConversationsResponse, DeleteConversationRequest, DeleteConversationResponse,
};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ConversationsResponse>, ApiError> {
    let conversations = state.conversations.list(&claims.sub).await?;
    Ok(Json(ConversationsResponse { conversations }))
}

/// DELETE /conversations — removes the conversation and, by cascade, its messages.
pub async fn delete_conversation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<DeleteConversationRequest>, JsonRejection>,
) -> Result<Json<DeleteConversationResponse>, ApiError> {
    let Json(req) = payload?;
    let conversation_id = req
        .conversation_id
        .ok_or_else(|| ApiError::InvalidRequest("Conversation ID is required".into()))?;

    state.conversations.delete(&claims.sub, conversation_id).await?;

    Ok(Json(DeleteConversationResponse { success: true }))
}
