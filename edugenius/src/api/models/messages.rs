//! Chat messages as accepted from the browser client on `/chat`.
//!
//! The shape follows the OpenAI chat format, so a message converts directly into the upstream
//! [`ChatCompletionRequestMessage`]:
//!
//! ```json
//! {"role": "user", "content": [
//!     {"type": "text", "text": "Explain this"},
//!     {"type": "image_url", "image_url": {"url": "data:image/png;base64,<base64>"}}
//! ]}
//! ```

use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestAssistantMessageContentPart, ChatCompletionRequestMessage,
    ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestSystemMessageContentPart,
    ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent,
    ChatCompletionRequestUserMessageContentPart, InputAudioFormat,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::completion::{image_url_part, input_audio_part, text_part};
use crate::errors::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of a conversation. Order within a conversation is significant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

/// Plain text, or a list of typed parts for multimodal input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    InputAudio { input_audio: InputAudio },
    ImageUrl { image_url: ImageUrl },
}

/// Inline base64 audio with its declared container format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InputAudio {
    pub data: String,
    pub format: String,
}

/// An image or document reference; a `data:` URI for inline payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ImageUrl {
    pub url: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(content.into()),
        }
    }
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }
}

fn audio_format(format: &str) -> Result<InputAudioFormat, Error> {
    match format {
        "wav" => Ok(InputAudioFormat::Wav),
        "mp3" => Ok(InputAudioFormat::Mp3),
        other => Err(Error::BadRequest {
            message: format!("Unsupported audio format: '{}'", other),
        }),
    }
}

/// Text of every part; system and assistant messages cannot carry media.
fn text_parts(role: &str, parts: Vec<ContentPart>) -> Result<Vec<ChatCompletionRequestMessageContentPartText>, Error> {
    parts
        .into_iter()
        .map(|part| match part {
            ContentPart::Text { text } => Ok(ChatCompletionRequestMessageContentPartText { text }),
            _ => Err(Error::BadRequest {
                message: format!("Only text content is allowed in {} messages", role),
            }),
        })
        .collect()
}

impl TryFrom<ContentPart> for ChatCompletionRequestUserMessageContentPart {
    type Error = Error;

    fn try_from(part: ContentPart) -> Result<Self, Error> {
        Ok(match part {
            ContentPart::Text { text } => text_part(text),
            ContentPart::InputAudio { input_audio } => input_audio_part(input_audio.data, audio_format(&input_audio.format)?),
            ContentPart::ImageUrl { image_url } => image_url_part(image_url.url),
        })
    }
}

impl TryFrom<Message> for ChatCompletionRequestMessage {
    type Error = Error;

    fn try_from(message: Message) -> Result<Self, Error> {
        Ok(match message.role {
            Role::System => {
                let content = match message.content {
                    MessageContent::Text(text) => ChatCompletionRequestSystemMessageContent::Text(text),
                    MessageContent::Parts(parts) => ChatCompletionRequestSystemMessageContent::Array(
                        text_parts("system", parts)?
                            .into_iter()
                            .map(ChatCompletionRequestSystemMessageContentPart::Text)
                            .collect(),
                    ),
                };
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage { content, name: None })
            }
            Role::User => {
                let content = match message.content {
                    MessageContent::Text(text) => ChatCompletionRequestUserMessageContent::Text(text),
                    MessageContent::Parts(parts) => ChatCompletionRequestUserMessageContent::Array(
                        parts.into_iter().map(TryInto::try_into).collect::<Result<_, Error>>()?,
                    ),
                };
                ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage { content, name: None })
            }
            Role::Assistant => {
                let content = match message.content {
                    MessageContent::Text(text) => ChatCompletionRequestAssistantMessageContent::Text(text),
                    MessageContent::Parts(parts) => ChatCompletionRequestAssistantMessageContent::Array(
                        text_parts("assistant", parts)?
                            .into_iter()
                            .map(ChatCompletionRequestAssistantMessageContentPart::Text)
                            .collect(),
                    ),
                };
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content: Some(content),
                    ..Default::default()
                })
            }
        })
    }
}
