use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use tracing::instrument;

use super::multipart::{discard, duplicate_field, missing_field, next_field, stage_file_field};
use crate::AppState;
use crate::api::models::voice::{TranscriptionResponse, VoiceInputForm};
use crate::conversation;
use crate::errors::{Error, ErrorBody, Result};

#[utoipa::path(
    post,
    path = "/voice-input",
    tag = "conversation",
    summary = "Transcribe voice input",
    description = "Transcribe a recorded clip. The clip is always declared to the model as WAV.",
    request_body(content = VoiceInputForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Transcription", body = TranscriptionResponse),
        (status = 413, description = "Upload exceeds the size limit", body = ErrorBody),
        (status = 422, description = "Missing, repeated or malformed file field", body = ErrorBody),
        (status = 500, description = "Staging, encoding or completion failure", body = ErrorBody)
    )
)]
#[instrument(skip_all)]
pub async fn voice_input(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<TranscriptionResponse>> {
    let mut multipart = multipart?;
    let mut staged = None;

    let fields = async {
        while let Some(field) = next_field(&mut multipart).await? {
            if field.name() == Some("file") {
                if staged.is_some() {
                    return Err(duplicate_field("file"));
                }
                staged = Some(stage_file_field(field, &state.config.storage.upload_dir).await?);
            }
        }
        Ok::<(), Error>(())
    }
    .await;

    if let Err(e) = fields {
        if let Some(staged) = staged {
            discard(staged).await;
        }
        return Err(e);
    }

    let staged = staged.ok_or_else(|| missing_field("file"))?;
    let response = conversation::transcribe(&state, staged).await?;
    Ok(Json(response))
}
