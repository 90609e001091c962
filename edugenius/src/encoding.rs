//! Base64 encoding of staged files for inline API payloads.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::io;
use std::path::Path;

/// Read the whole file at `path` and return it as standard, padded base64.
pub async fn encode_file(path: &Path) -> io::Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(STANDARD.encode(bytes))
}
