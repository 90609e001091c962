use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::messages::Message;

/// Format tag of every synthesized clip
pub const AUDIO_FORMAT: &str = "mp3";

/// Request body for `POST /chat`
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ChatRequest {
    /// Prior conversation, oldest first
    pub messages: Vec<Message>,
    /// Replaces the default persona prompt when present
    #[serde(default)]
    pub system_message: Option<String>,
}

/// Spoken version of a response. `audio_content` is null when synthesis failed.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct AudioPayload {
    /// Base64-encoded MP3
    pub audio_content: Option<String>,
    pub format: String,
}

impl AudioPayload {
    pub fn mp3(audio_content: Option<String>) -> Self {
        Self {
            audio_content,
            format: AUDIO_FORMAT.to_string(),
        }
    }
}

/// Response body for `POST /chat`
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ChatResponse {
    pub response: String,
    pub audio: AudioPayload,
    pub model: String,
}
