use axum::{
    Json,
    extract::{multipart::MultipartRejection, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use utoipa::ToSchema;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Malformed request: missing multipart field, unreadable form body
    #[error("{message}")]
    BadRequest { message: String },

    /// Upload exceeded `limits.max_upload_bytes`
    #[error("{message}")]
    PayloadTooLarge { message: String },

    /// Writing an upload to the staging directory failed
    #[error("{0}")]
    Staging(#[source] std::io::Error),

    /// Reading a staged file back for base64 encoding failed
    #[error("{0}")]
    Encoding(#[source] std::io::Error),

    /// The upstream completion API failed or returned something unusable
    #[error("{message}")]
    Completion { message: String },

    /// Configuration is inconsistent
    #[error("Config validation: {message}")]
    Config { message: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// The original error message
    pub detail: String,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Staging(_) | Error::Encoding(_) | Error::Completion { .. } | Error::Config { .. } | Error::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short label for the error kind, used as a structured logging field
    pub fn kind(&self) -> &'static str {
        match self {
            Error::BadRequest { .. } => "bad_request",
            Error::PayloadTooLarge { .. } => "payload_too_large",
            Error::Staging(_) => "staging",
            Error::Encoding(_) => "encoding",
            Error::Completion { .. } => "completion",
            Error::Config { .. } => "config",
            Error::Other(_) => "other",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::BadRequest { .. } | Error::PayloadTooLarge { .. } => {
                tracing::debug!(kind = self.kind(), "Client error: {}", self);
            }
            _ => {
                tracing::error!(kind = self.kind(), "Request failed: {:#}", self);
            }
        }

        let status = self.status_code();
        let body = ErrorBody { detail: self.to_string() };
        (status, Json(body)).into_response()
    }
}

impl Error {
    fn from_rejection(status: StatusCode, message: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            Error::PayloadTooLarge { message }
        } else {
            Error::BadRequest { message }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartRejection> for Error {
    fn from(rejection: MultipartRejection) -> Self {
        Error::from_rejection(rejection.status(), rejection.body_text())
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
