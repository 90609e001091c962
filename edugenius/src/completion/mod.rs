//! Client for the upstream chat completions API.
//!
//! Any OpenAI-compatible endpoint works; the default is Gemini's OpenAI compatibility layer.
//! The orchestrator only depends on the [`CompletionClient`] trait, so tests substitute a
//! recording fake or point [`OpenAiCompatClient`] at a mock server. Messages use the
//! `async-openai` chat types; the builders below cover the shapes this service sends.

pub mod openai;

use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartAudio,
    ChatCompletionRequestMessageContentPartImage, ChatCompletionRequestMessageContentPartText,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart, ImageUrl, InputAudio,
    InputAudioFormat,
};
use async_trait::async_trait;
use url::Url;

use crate::errors::Result;

pub use openai::OpenAiCompatClient;

/// A chat completions backend.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Model name reported back to clients
    fn model(&self) -> &str;

    /// Send `messages` and return the content of the first choice.
    async fn complete(&self, messages: &[ChatCompletionRequestMessage]) -> Result<String>;
}

pub fn system_message(text: impl Into<String>) -> ChatCompletionRequestMessage {
    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
        content: ChatCompletionRequestSystemMessageContent::Text(text.into()),
        name: None,
    })
}

pub fn user_message(parts: Vec<ChatCompletionRequestUserMessageContentPart>) -> ChatCompletionRequestMessage {
    ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
        content: ChatCompletionRequestUserMessageContent::Array(parts),
        name: None,
    })
}

pub fn text_part(text: impl Into<String>) -> ChatCompletionRequestUserMessageContentPart {
    ChatCompletionRequestUserMessageContentPart::Text(ChatCompletionRequestMessageContentPartText { text: text.into() })
}

pub fn input_audio_part(data: String, format: InputAudioFormat) -> ChatCompletionRequestUserMessageContentPart {
    ChatCompletionRequestUserMessageContentPart::InputAudio(ChatCompletionRequestMessageContentPartAudio {
        input_audio: InputAudio { data, format },
    })
}

pub fn image_url_part(url: String) -> ChatCompletionRequestUserMessageContentPart {
    ChatCompletionRequestUserMessageContentPart::ImageUrl(ChatCompletionRequestMessageContentPartImage {
        image_url: ImageUrl { url, detail: None },
    })
}

/// Inline payload as `data:<content_type>;base64,<data>`
pub fn inline_data_part(content_type: &str, base64_data: &str) -> ChatCompletionRequestUserMessageContentPart {
    image_url_part(format!("data:{content_type};base64,{base64_data}"))
}

/// Makes sure a url has a trailing slash.
///
/// `Url::join` replaces the last path segment unless the base ends in `/`: joining
/// `/v1beta/openai` with `chat/completions` gives `/v1beta/chat/completions`. Call this before
/// calling `.join`.
pub(crate) fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let mut path = new_url.path().to_string();
        path.push('/');
        new_url.set_path(&path);
        new_url
    }
}
