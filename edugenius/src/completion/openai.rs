//! reqwest implementation of [`CompletionClient`] for `POST {base_url}/chat/completions`.

use async_openai::types::chat::{ChatCompletionRequestMessage, CreateChatCompletionRequest, CreateChatCompletionResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, instrument};
use url::Url;

use super::{CompletionClient, ensure_slash};
use crate::config::CompletionConfig;
use crate::errors::{Error, Result};

pub struct OpenAiCompatClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    model: String,
}

impl OpenAiCompatClient {
    pub fn new(base_url: &Url, api_key: Option<String>, model: String, request_timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create completion HTTP client: {}", e))?;
        let endpoint = ensure_slash(base_url)
            .join("chat/completions")
            .map_err(|e| anyhow::anyhow!("Failed to construct completions URL: {}", e))?;
        Ok(Self {
            client,
            endpoint,
            api_key,
            model,
        })
    }

    pub fn from_config(config: &CompletionConfig) -> anyhow::Result<Self> {
        Self::new(
            &config.base_url,
            config.api_key.clone(),
            config.model.clone(),
            config.request_timeout,
        )
    }
}

fn completion_error(message: impl Into<String>) -> Error {
    Error::Completion { message: message.into() }
}

#[async_trait]
impl CompletionClient for OpenAiCompatClient {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model, message_count = messages.len()))]
    async fn complete(&self, messages: &[ChatCompletionRequestMessage]) -> Result<String> {
        let body = CreateChatCompletionRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            ..Default::default()
        };

        let mut request = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| completion_error(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(url = %self.endpoint, %status, "Completion request failed");
            return Err(completion_error(format!("Completion API error: {} - {}", status, body)));
        }

        let body_text = response.text().await.map_err(|e| completion_error(e.to_string()))?;
        debug!(body_len = body_text.len(), "Completion response received");

        let parsed: CreateChatCompletionResponse = serde_json::from_str(&body_text).map_err(|e| {
            error!("Failed to parse completion response as JSON: {}", e);
            completion_error(format!("error decoding response body: {}", e))
        })?;

        let first = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| completion_error("Completion API returned no choices"))?;

        Ok(first.message.content.unwrap_or_default())
    }
}
