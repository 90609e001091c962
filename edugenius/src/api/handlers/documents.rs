use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use tracing::instrument;

use super::multipart::{discard, duplicate_field, missing_field, next_field, stage_file_field, text_field};
use crate::AppState;
use crate::api::models::documents::{DocumentChatForm, DocumentChatResponse};
use crate::conversation::{self, DocumentChatRequest};
use crate::errors::{Error, ErrorBody, Result};

#[utoipa::path(
    post,
    path = "/document-chat",
    tag = "conversation",
    summary = "Ask about a document",
    description = "Upload an image, PDF or Word document and ask a question about it. The document \
                   is kept on the server and its staged name is returned as `document_id`.",
    request_body(content = DocumentChatForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Model answer with spoken audio", body = DocumentChatResponse),
        (status = 413, description = "Upload exceeds the size limit", body = ErrorBody),
        (status = 422, description = "Missing query or file field, or a repeated file field", body = ErrorBody),
        (status = 500, description = "Staging, encoding or completion failure", body = ErrorBody)
    )
)]
#[instrument(skip_all)]
pub async fn document_chat(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<DocumentChatResponse>> {
    let mut multipart = multipart?;
    let mut query = None;
    let mut document = None;
    let mut system_message = None;

    // Fields arrive in client order; the file is staged as soon as it is reached
    let fields = async {
        while let Some(field) = next_field(&mut multipart).await? {
            match field.name() {
                Some("query") => query = Some(text_field(field, "query").await?),
                Some("file") => {
                    if document.is_some() {
                        return Err(duplicate_field("file"));
                    }
                    document = Some(stage_file_field(field, &state.config.storage.upload_dir).await?);
                }
                Some("system_message") => system_message = Some(text_field(field, "system_message").await?),
                _ => {
                    // Ignore unknown fields (forward compatibility)
                }
            }
        }
        Ok::<(), Error>(())
    }
    .await;

    // A rejected request keeps nothing on disk
    let query = match fields.and_then(|()| query.ok_or_else(|| missing_field("query"))) {
        Ok(query) => query,
        Err(e) => {
            if let Some(document) = document {
                discard(document).await;
            }
            return Err(e);
        }
    };
    let document = document.ok_or_else(|| missing_field("file"))?;

    let response = conversation::document_chat(
        &state,
        DocumentChatRequest {
            query,
            document,
            system_message,
        },
    )
    .await?;
    Ok(Json(response))
}
