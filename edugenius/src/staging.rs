//! Staging of uploaded files.
//!
//! Every upload is streamed to `<upload_dir>/<uuid>.<ext>`, keeping the extension of the client's
//! file name. The caller owns the cleanup: the voice path deletes the file right after encoding it,
//! the document path keeps it and hands its file name back as `document_id`.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// An upload persisted under a generated name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub id: Uuid,
    /// Extension of the original file name, without the dot; empty if it had none
    pub extension: String,
    pub path: PathBuf,
}

impl StagedFile {
    /// Reserve a fresh, unused name in `dir`. Nothing is written.
    pub fn allocate(dir: &Path, extension: &str) -> Self {
        let id = Uuid::new_v4();
        let file_name = if extension.is_empty() {
            id.to_string()
        } else {
            format!("{id}.{extension}")
        };
        Self {
            id,
            extension: extension.to_string(),
            path: dir.join(file_name),
        }
    }

    /// The staged file name without its directory
    pub fn document_id(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub async fn remove(&self) -> io::Result<()> {
        tokio::fs::remove_file(&self.path).await
    }
}

/// Everything after the last `.` of `filename`, or `""` when there is no dot.
pub fn file_extension(filename: &str) -> &str {
    filename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("")
}

/// Extension safe to put in a file name; anything that could change directory is dropped.
fn sanitized_extension(filename: &str) -> &str {
    let ext = file_extension(filename);
    if ext.contains(['/', '\\']) || ext == ".." { "" } else { ext }
}

/// Stream `chunks` into a newly allocated file in `dir`.
///
/// Fails if the directory is not writable, a write fails, or the stream yields an error (e.g. a
/// truncated multipart body). Once the file exists, any failure removes it.
#[instrument(skip(chunks), err)]
pub async fn stage_upload<S, E>(dir: &Path, original_filename: &str, chunks: S) -> io::Result<StagedFile>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let staged = StagedFile::allocate(dir, sanitized_extension(original_filename));
    let mut file = tokio::fs::File::create(&staged.path).await?;

    let total_bytes = match write_chunks(&mut file, chunks).await {
        Ok(total_bytes) => total_bytes,
        Err(e) => {
            drop(file);
            if let Err(remove_err) = tokio::fs::remove_file(&staged.path).await {
                warn!(path = %staged.path.display(), "Failed to remove partial upload: {}", remove_err);
            }
            return Err(e);
        }
    };

    debug!(
        staged_id = %staged.id,
        path = %staged.path.display(),
        total_bytes,
        "Staged upload"
    );
    Ok(staged)
}

/// Copy every chunk into `writer` and flush it. Stream errors are wrapped as `io::Error::other`.
async fn write_chunks<W, S, E>(writer: &mut W, chunks: S) -> io::Result<usize>
where
    W: AsyncWrite + Unpin,
    S: Stream<Item = Result<Bytes, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut chunks = std::pin::pin!(chunks);
    let mut total_bytes = 0usize;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(io::Error::other)?;
        total_bytes += chunk.len();
        writer.write_all(&chunk).await?;
    }
    writer.flush().await?;
    Ok(total_bytes)
}
