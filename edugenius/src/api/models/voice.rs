use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response body for `POST /voice-input`
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct TranscriptionResponse {
    pub transcription: String,
    pub model: String,
}

/// Multipart body for `POST /voice-input`, for the OpenAPI document only
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct VoiceInputForm {
    /// Recorded audio
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}
