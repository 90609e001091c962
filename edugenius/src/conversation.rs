//! The three conversation flows behind the HTTP endpoints.
//!
//! Each flow assembles a message list, calls the completion API once, optionally voices the
//! answer and shapes the response. Staging, encoding and completion errors propagate as
//! [`Error`]; speech never fails a request.

use async_openai::types::chat::{ChatCompletionRequestMessage, InputAudioFormat};
use tracing::{info, instrument, warn};

use crate::AppState;
use crate::api::models::chat::{AudioPayload, ChatRequest, ChatResponse};
use crate::api::models::documents::DocumentChatResponse;
use crate::api::models::voice::TranscriptionResponse;
use crate::completion::{inline_data_part, input_audio_part, system_message, text_part, user_message};
use crate::encoding::encode_file;
use crate::errors::{Error, Result};
use crate::staging::StagedFile;

/// Instruction sent alongside uploaded voice recordings
pub const TRANSCRIBE_INSTRUCTION: &str = "Transcribe this audio accurately";

/// Declared format of every voice upload. The browser client records WAV; the upload's own
/// extension is not consulted.
pub const VOICE_INPUT_FORMAT: InputAudioFormat = InputAudioFormat::Wav;

/// A question about an uploaded document.
#[derive(Debug)]
pub struct DocumentChatRequest {
    pub query: String,
    pub document: StagedFile,
    pub system_message: Option<String>,
}

/// MIME type declared for a document, from its extension.
///
/// Unknown extensions fall back to `image/jpeg`.
pub fn content_type_for_extension(extension: &str) -> String {
    let extension = extension.to_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" | "png" => format!("image/{extension}"),
        "pdf" => "application/pdf".to_string(),
        "doc" | "docx" => "application/msword".to_string(),
        _ => "image/jpeg".to_string(),
    }
}

/// `[system, ...history]` with the override taking precedence over the default prompt.
pub fn with_system_prompt(
    system_override: Option<String>,
    default_prompt: &str,
    history: Vec<ChatCompletionRequestMessage>,
) -> Vec<ChatCompletionRequestMessage> {
    let system = system_override.unwrap_or_else(|| default_prompt.to_string());
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(system_message(system));
    messages.extend(history);
    messages
}

/// Text chat: prepend the system prompt, answer, and voice the answer.
///
/// History entries that cannot be sent upstream (media in a system message, an unknown audio
/// format) are rejected as [`Error::BadRequest`].
#[instrument(skip_all, fields(history_len = request.messages.len()))]
pub async fn chat(state: &AppState, request: ChatRequest) -> Result<ChatResponse> {
    let history = request
        .messages
        .into_iter()
        .map(ChatCompletionRequestMessage::try_from)
        .collect::<Result<Vec<_>>>()?;
    let messages = with_system_prompt(request.system_message, &state.config.prompts.chat_system_message, history);

    let text_response = state.completion.complete(&messages).await?;
    let audio_content = state.speech.speak(&text_response, &state.config.speech.language).await;

    Ok(ChatResponse {
        response: text_response,
        audio: AudioPayload::mp3(audio_content),
        model: state.completion.model().to_string(),
    })
}

/// Voice input: send the staged recording for transcription. The staged file is deleted as soon
/// as it has been encoded.
#[instrument(skip_all, fields(staged_id = %staged.id))]
pub async fn transcribe(state: &AppState, staged: StagedFile) -> Result<TranscriptionResponse> {
    let base64_audio = encode_file(&staged.path).await.map_err(Error::Encoding)?;

    if let Err(e) = staged.remove().await {
        warn!(path = %staged.path.display(), "Failed to remove staged recording: {}", e);
    }

    let messages = [user_message(vec![
        text_part(TRANSCRIBE_INSTRUCTION),
        input_audio_part(base64_audio, VOICE_INPUT_FORMAT),
    ])];

    let transcription = state.completion.complete(&messages).await?;
    info!(transcription_len = transcription.len(), "Transcribed voice input");

    Ok(TranscriptionResponse {
        transcription,
        model: state.completion.model().to_string(),
    })
}

/// Document chat: ask `query` about the staged document and voice the answer. The document stays
/// on disk and its file name is returned as `document_id`.
#[instrument(skip_all, fields(document_id = %request.document.document_id()))]
pub async fn document_chat(state: &AppState, request: DocumentChatRequest) -> Result<DocumentChatResponse> {
    let DocumentChatRequest {
        query,
        document,
        system_message,
    } = request;

    let base64_document = encode_file(&document.path).await.map_err(Error::Encoding)?;
    let content_type = content_type_for_extension(&document.extension);

    let question = user_message(vec![text_part(query), inline_data_part(&content_type, &base64_document)]);
    let messages = with_system_prompt(system_message, &state.config.prompts.document_system_message, vec![question]);

    let text_response = state.completion.complete(&messages).await?;
    let audio_content = state.speech.speak(&text_response, &state.config.speech.language).await;

    Ok(DocumentChatResponse {
        response: text_response,
        audio: AudioPayload::mp3(audio_content),
        document_id: document.document_id(),
        model: state.completion.model().to_string(),
    })
}
