//! OpenAPI documentation for the conversation API, served through Scalar at `/docs`.

use utoipa::OpenApi;

use crate::api;
use crate::errors::ErrorBody;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "EduGenius API",
        description = "Educational assistant backend: chat, voice transcription and document \
                       questions answered by a multimodal model, with spoken replies."
    ),
    paths(
        api::handlers::chat::chat,
        api::handlers::voice::voice_input,
        api::handlers::documents::document_chat,
    ),
    components(
        schemas(
            api::models::messages::Role,
            api::models::messages::Message,
            api::models::messages::MessageContent,
            api::models::messages::ContentPart,
            api::models::messages::InputAudio,
            api::models::messages::ImageUrl,
            api::models::chat::ChatRequest,
            api::models::chat::ChatResponse,
            api::models::chat::AudioPayload,
            api::models::voice::TranscriptionResponse,
            api::models::voice::VoiceInputForm,
            api::models::documents::DocumentChatResponse,
            api::models::documents::DocumentChatForm,
            ErrorBody,
        )
    ),
    tags(
        (name = "conversation", description = "Talk to the model. Every reply that carries text is also \
            voiced; when speech synthesis fails the reply still succeeds with `audio.audio_content: null`."),
    )
)]
pub struct ApiDoc;
