//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `EDUGENIUS_CONFIG`
//! environment variable. A missing file is not an error: every field has a default.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `EDUGENIUS_` override YAML values
//! 3. **GEMINI_API_KEY** - Special case: overrides `completion.api_key` if set
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `EDUGENIUS_COMPLETION__MODEL=gemini-2.5-flash` sets the `completion.model` field.
//!
//! ## Configuration Structure
//!
//! - **Server**: `host`, `port` - HTTP server binding configuration
//! - **Completion**: `completion.base_url`, `completion.api_key`, `completion.model` - the
//!   OpenAI-compatible chat completions API that answers every request
//! - **Speech**: `speech.enabled`, `speech.base_url`, `speech.language` - text-to-speech provider
//! - **Storage**: `storage.upload_dir`, `storage.audio_dir` - staging directories
//! - **Prompts**: `prompts.chat_system_message`, `prompts.document_system_message`
//! - **Security**: `cors` - CORS settings for the browser client
//! - **Features**: `enable_metrics`, `enable_otel_export` - Optional feature toggles
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! EDUGENIUS_PORT=8080
//!
//! # Set the completion API key (preferred method)
//! GEMINI_API_KEY="..."
//!
//! # Override nested values
//! EDUGENIUS_SPEECH__ENABLED=false
//! EDUGENIUS_STORAGE__UPLOAD_DIR=/var/lib/edugenius/uploads
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::errors::Error;

pub const DEFAULT_COMPLETION_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_CHAT_SYSTEM_MESSAGE: &str =
    "You are EduGenius, an educational AI assistant designed to help students learn effectively.";
pub const DEFAULT_DOCUMENT_SYSTEM_MESSAGE: &str =
    "You are EduGenius, an educational AI assistant. Analyze the document and answer the query accurately.";

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "EDUGENIUS_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Chat completions API used for chat, transcription and document questions
    pub completion: CompletionConfig,
    /// Text-to-speech provider used to voice answers
    pub speech: SpeechConfig,
    /// Directories for staged uploads and synthesized audio
    pub storage: StorageConfig,
    /// Default system prompts, used when the client does not send one
    pub prompts: PromptsConfig,
    /// CORS configuration for browser clients
    pub cors: CorsConfig,
    /// Request size limits
    pub limits: LimitsConfig,
    /// Enable Prometheus metrics endpoint at `/internal/metrics`
    pub enable_metrics: bool,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

/// OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompletionConfig {
    /// Base URL; `chat/completions` is joined onto it
    pub base_url: Url,
    /// Bearer token sent with every request
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Model name sent upstream and echoed in every response
    pub model: String,
    /// Timeout for a single completion request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

/// Google Translate text-to-speech provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpeechConfig {
    /// When false, responses carry no audio and the provider is never called
    pub enabled: bool,
    /// Base URL of the provider; `translate_tts` is joined onto it
    pub base_url: Url,
    /// Language code passed to the provider
    pub language: String,
    /// Timeout for each chunk request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Where uploaded audio and documents are staged
    pub upload_dir: PathBuf,
    /// Where synthesized audio is written before being read back
    pub audio_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PromptsConfig {
    /// System prompt for `/chat`
    pub chat_system_message: String,
    /// System prompt for `/document-chat`
    pub document_system_message: String,
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes, applied to the upload endpoints
    pub max_upload_bytes: usize,
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            completion: CompletionConfig::default(),
            speech: SpeechConfig::default(),
            storage: StorageConfig::default(),
            prompts: PromptsConfig::default(),
            cors: CorsConfig::default(),
            limits: LimitsConfig::default(),
            enable_metrics: false,
            enable_otel_export: false,
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_COMPLETION_BASE_URL).unwrap(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: Url::parse("https://translate.google.com/").unwrap(),
            language: "en".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("./uploads"),
            audio_dir: PathBuf::from("./audio_temp"),
        }
    }
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            chat_system_message: DEFAULT_CHAT_SYSTEM_MESSAGE.to_string(),
            document_system_message: DEFAULT_DOCUMENT_SYSTEM_MESSAGE.to_string(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            allow_credentials: true,
            max_age: Some(3600), // Cache preflight for 1 hour
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.completion.model.trim().is_empty() {
            return Err(Error::Config {
                message: "completion.model must not be empty".to_string(),
            });
        }

        if self.speech.language.trim().is_empty() {
            return Err(Error::Config {
                message: "speech.language must not be empty".to_string(),
            });
        }

        if self.limits.max_upload_bytes == 0 {
            return Err(Error::Config {
                message: "limits.max_upload_bytes must be greater than zero".to_string(),
            });
        }

        if self.completion.api_key.is_none() {
            tracing::warn!("No completion API key configured; set GEMINI_API_KEY or EDUGENIUS_COMPLETION__API_KEY");
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values; EDUGENIUS_CONFIG is the file path itself
            .merge(Env::prefixed("EDUGENIUS_").ignore(&["CONFIG"]).split("__"))
            // The conventional variable for the Gemini key
            .merge(
                Env::raw()
                    .only(&["GEMINI_API_KEY"])
                    .map(|_| "completion.api_key".into()),
            )
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
