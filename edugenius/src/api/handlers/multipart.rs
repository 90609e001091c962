//! Shared multipart parsing for the upload endpoints.

use axum::extract::Multipart;
use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use std::path::Path;

use crate::errors::{Error, Result};
use crate::staging::{StagedFile, stage_upload};

fn multipart_error(e: &MultipartError, context: &str) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge {
            message: format!("Upload exceeds the size limit: {}", e.body_text()),
        }
    } else {
        Error::BadRequest {
            message: format!("{}: {}", context, e.body_text()),
        }
    }
}

pub async fn next_field(multipart: &mut Multipart) -> Result<Option<Field<'_>>> {
    multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e, "Failed to parse multipart data"))
}

/// Stream a file field straight into the staging directory.
pub async fn stage_file_field(field: Field<'_>, upload_dir: &Path) -> Result<StagedFile> {
    let filename = field.file_name().unwrap_or_default().to_string();
    tracing::info!(filename = %filename, "Staging uploaded file");
    stage_upload(upload_dir, &filename, field).await.map_err(|e| {
        // A body-limit or framing error from the client surfaces wrapped in the io::Error
        match e.get_ref().and_then(|inner| inner.downcast_ref::<MultipartError>()) {
            Some(multipart) => multipart_error(multipart, "Failed to read upload"),
            None => Error::Staging(e),
        }
    })
}

pub async fn text_field(field: Field<'_>, name: &str) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| multipart_error(&e, &format!("Failed to read {}", name)))
}

pub fn missing_field(name: &str) -> Error {
    Error::BadRequest {
        message: format!("Missing required field: '{}'", name),
    }
}

pub fn duplicate_field(name: &str) -> Error {
    Error::BadRequest {
        message: format!("Duplicate field: '{}'", name),
    }
}

/// Remove a staged upload belonging to a request that is being rejected.
pub async fn discard(staged: StagedFile) {
    if let Err(e) = staged.remove().await {
        tracing::warn!(path = %staged.path.display(), "Failed to remove rejected upload: {}", e);
    }
}
