use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use tracing::instrument;

use crate::AppState;
use crate::api::models::chat::{ChatRequest, ChatResponse};
use crate::conversation;
use crate::errors::{ErrorBody, Result};

#[utoipa::path(
    post,
    path = "/chat",
    tag = "conversation",
    summary = "Chat",
    description = "Answer the conversation with the configured model and voice the answer. \
                   `audio.audio_content` is null when speech synthesis failed.",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Model answer with spoken audio", body = ChatResponse),
        (status = 422, description = "Malformed request body", body = ErrorBody),
        (status = 500, description = "Completion API failure", body = ErrorBody)
    )
)]
#[instrument(skip_all)]
pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    let Json(request) = payload?;
    let response = conversation::chat(&state, request).await?;
    Ok(Json(response))
}
