//! Text-to-speech for chat and document answers.
//!
//! Synthesis is best-effort. [`SpeechService::speak`] never fails: any provider, network or disk
//! error is logged and turned into `None`, so the caller can still return the text answer. This is
//! the only component with that policy; staging, encoding and completion errors all propagate.
//!
//! The flow mirrors what the web client expects: the provider's MP3 is written to
//! `<audio_dir>/<uuid>.mp3`, read back as base64, and the file is deleted.

pub mod google;

use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::encoding::encode_file;

pub use google::GoogleTranslateTts;

/// A text-to-speech provider producing MP3 audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, language: &str) -> anyhow::Result<Vec<u8>>;
}

/// Speech synthesis with the degrade-to-`None` contract.
#[derive(Clone)]
pub struct SpeechService {
    /// `None` when speech is switched off in config
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    audio_dir: PathBuf,
}

impl SpeechService {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, audio_dir: PathBuf) -> Self {
        Self {
            synthesizer: Some(synthesizer),
            audio_dir,
        }
    }

    /// A service that never produces audio
    pub fn disabled(audio_dir: PathBuf) -> Self {
        Self {
            synthesizer: None,
            audio_dir,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.synthesizer.is_some()
    }

    /// Synthesize `text` and return the MP3 as base64, or `None` if anything went wrong.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn speak(&self, text: &str, language: &str) -> Option<String> {
        let synthesizer = self.synthesizer.as_ref()?;

        match self.synthesize_to_base64(synthesizer.as_ref(), text, language).await {
            Ok(audio) => {
                debug!(encoded_len = audio.len(), "Synthesized speech");
                Some(audio)
            }
            Err(e) => {
                warn!("Error in TTS, responding without audio: {:#}", e);
                None
            }
        }
    }

    async fn synthesize_to_base64(&self, synthesizer: &dyn SpeechSynthesizer, text: &str, language: &str) -> anyhow::Result<String> {
        let audio = synthesizer.synthesize(text, language).await?;

        let audio_file = self.audio_dir.join(format!("{}.mp3", Uuid::new_v4()));
        tokio::fs::write(&audio_file, &audio)
            .await
            .with_context(|| format!("Failed to write {}", audio_file.display()))?;

        // Delete before looking at the read result so the artifact never outlives the call
        let encoded = encode_file(&audio_file).await;
        let removed = tokio::fs::remove_file(&audio_file).await;

        let encoded = encoded.with_context(|| format!("Failed to read {}", audio_file.display()))?;
        removed.with_context(|| format!("Failed to remove {}", audio_file.display()))?;
        Ok(encoded)
    }
}
