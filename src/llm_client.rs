use std::time::Duration;

use serde_json::{Value, json};

use crate::io_struct::Message;

const LLM_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for an OpenAI/Ollama-compatible chat-completions API.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let api_base = std::env::var("OPENAI_API_BASE").unwrap_or_default();
        LlmConfig {
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "llama3".to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API base URL not set")]
    ApiBaseNotSet,
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Non-JSON response: {0}")]
    NonJson(String),
    #[error("Bad response: {0}")]
    BadResponse(String),
}

#[derive(Clone)]
pub struct LlmClient {
    config: LlmConfig,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(LLM_TIMEOUT).build()?;
        Ok(LlmClient { config, client })
    }

    /// Call the chat-completions endpoint and return the first choice's trimmed
    /// content. Every failure path comes back as an `LlmError`; this never
    /// panics, so callers can treat errors as fallback-text material.
    pub async fn chat_completions(
        &self,
        messages: &[Message],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        if self.config.api_base.is_empty() {
            return Err(LlmError::ApiBaseNotSet);
        }

        let url = format!("{}/chat/completions", self.config.api_base);
        let body = json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        let mut request = self.client.post(&url).json(&body);
        if self.has_auth() {
            request = request.bearer_auth(&self.config.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;
        let raw = response
            .text()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        let data: Value =
            serde_json::from_str(&raw).map_err(|_| LlmError::NonJson(raw.clone()))?;

        let content = data
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty());

        match content {
            Some(text) => Ok(text.to_string()),
            None => Err(LlmError::BadResponse(data.to_string())),
        }
    }

    fn has_auth(&self) -> bool {
        !self.config.api_key.is_empty() && !self.config.api_key.eq_ignore_ascii_case("none")
    }
}
