//! Google Translate text-to-speech, the provider behind gTTS.
//!
//! The endpoint only accepts short inputs, so text is split into chunks of at most
//! [`MAX_CHUNK_CHARS`] characters on whitespace and each chunk is fetched separately. MP3 frames
//! concatenate cleanly, so the chunk bodies are appended in order.

use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::SpeechSynthesizer;
use crate::completion::ensure_slash;
use crate::config::SpeechConfig;

/// Longest chunk the endpoint reliably accepts
pub const MAX_CHUNK_CHARS: usize = 100;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

pub struct GoogleTranslateTts {
    client: Client,
    base_url: Url,
}

impl GoogleTranslateTts {
    pub fn new(base_url: Url, request_timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create TTS HTTP client")?;
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &SpeechConfig) -> anyhow::Result<Self> {
        Self::new(config.base_url.clone(), config.request_timeout)
    }

    fn chunk_url(&self, chunk: &str, language: &str, idx: usize, total: usize) -> anyhow::Result<Url> {
        let mut url = ensure_slash(&self.base_url)
            .join("translate_tts")
            .map_err(|e| anyhow!("Failed to construct TTS URL: {}", e))?;
        url.query_pairs_mut()
            .append_pair("ie", "UTF-8")
            .append_pair("q", chunk)
            .append_pair("tl", language)
            .append_pair("total", &total.to_string())
            .append_pair("idx", &idx.to_string())
            .append_pair("textlen", &chunk.chars().count().to_string())
            .append_pair("client", "tw-ob");
        Ok(url)
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn synthesize(&self, text: &str, language: &str) -> anyhow::Result<Vec<u8>> {
        let chunks = split_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            bail!("No text to speak");
        }

        let total = chunks.len();
        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let url = self.chunk_url(chunk, language, idx, total)?;
            let response = self.client.get(url).send().await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                bail!("TTS API error on chunk {}/{}: {} - {}", idx + 1, total, status, body);
            }

            let bytes = response.bytes().await?;
            debug!(chunk = idx + 1, total, bytes = bytes.len(), "Fetched TTS chunk");
            audio.extend_from_slice(&bytes);
        }

        Ok(audio)
    }
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Whitespace is collapsed and chunks break between words; a single word longer than `max_chars`
/// is cut on character boundaries. Chunks with nothing speakable (only punctuation) are dropped.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() { word_len } else { current_len + 1 + word_len };
        if needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks.retain(|chunk| chunk.chars().any(char::is_alphanumeric));
    chunks
}
