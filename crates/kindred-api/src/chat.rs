use axum::{
    Extension, Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use kindred_companion::crisis::{CRISIS_NOTICE, crisis_resources};
use kindred_companion::turn::{TurnOutcome, TurnRequest};
use kindred_types::api::{Claims, HistoryQuery, HistoryResponse, SendTurnRequest, TurnResponse};

use crate::error::ApiError;
use crate::state::AppState;

/// GET /chat — the full transcript of the requested conversation, or of
/// today's conversation when no id is given.
pub async fn get_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let Query(query) = query?;

    let (conversation, messages) = state
        .conversations
        .transcript(&claims.sub, query.conversation_id)
        .await?;

    Ok(Json(HistoryResponse {
        conversation_id: conversation.id,
        messages,
    }))
}

/// POST /chat — run one turn.
pub async fn send_turn(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<SendTurnRequest>, JsonRejection>,
) -> Result<Json<TurnResponse>, ApiError> {
    let Json(req) = payload?;
    let message = req
        .message
        .ok_or_else(|| ApiError::InvalidRequest("Message is required".into()))?;

    let outcome = state
        .turns
        .handle(
            &claims.sub,
            TurnRequest {
                message,
                conversation_id: req.conversation_id,
                audio_features: req.audio_features,
            },
        )
        .await?;

    let response = match outcome {
        TurnOutcome::Reply { reply, .. } => TurnResponse {
            message: Some(reply),
            crisis: false,
            keywords: None,
            notice: None,
            resources: None,
        },
        TurnOutcome::CrisisHalt { keywords } => TurnResponse {
            message: None,
            crisis: true,
            keywords: Some(keywords),
            notice: Some(CRISIS_NOTICE.to_string()),
            resources: Some(crisis_resources()),
        },
    };

    Ok(Json(response))
}
