//! API request and response data models.
//!
//! These define the public JSON contract of the service and the wire format of the
//! chat-completion messages forwarded to the model. All models carry `utoipa` annotations.
//!
//! - [`messages`]: conversation messages and multimodal content parts
//! - [`chat`]: `/chat` request and response
//! - [`voice`]: `/voice-input` form and response
//! - [`documents`]: `/document-chat` form and response

pub mod chat;
pub mod documents;
pub mod messages;
pub mod voice;
