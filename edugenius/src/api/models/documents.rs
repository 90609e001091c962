use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::chat::AudioPayload;

/// Response body for `POST /document-chat`
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct DocumentChatResponse {
    pub response: String,
    pub audio: AudioPayload,
    /// File name of the staged document, which stays on disk
    pub document_id: String,
    pub model: String,
}

/// Multipart body for `POST /document-chat`, for the OpenAPI document only
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct DocumentChatForm {
    /// Question about the document
    pub query: String,
    /// The document: an image, PDF or Word file
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Replaces the default document prompt when present
    pub system_message: Option<String>,
}
