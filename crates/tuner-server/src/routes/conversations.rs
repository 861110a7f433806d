//! Conversation routes.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tuner_core::{Conversation, ConversationReply};

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/conversations", post(start_conversation))
        .route("/conversations/{id}", get(get_conversation))
        .route("/conversations/{id}/messages", post(send_message))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartConversationResponse {
    pub conversation_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub message: String,
    #[serde(default)]
    pub global_prompt: String,
    pub prompt: String,
}

async fn start_conversation(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<StartConversationResponse>) {
    let conversation_id = state.conversations.start().await;
    (
        StatusCode::CREATED,
        Json(StartConversationResponse { conversation_id }),
    )
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<ConversationReply>, ApiError> {
    let Json(request) = payload?;
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".into()));
    }

    let reply = state
        .conversations
        .send(&id, &request.message, &request.global_prompt, &request.prompt)
        .await?;
    Ok(Json(reply))
}

async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    let conversation = state.conversations.get(&id).await?;
    Ok(Json(conversation))
}
