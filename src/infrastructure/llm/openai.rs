// src/infrastructure/llm/openai.rs
// OpenAI chat completions client.

use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::domain::errors::{LlmError, LlmResult};
use crate::domain::models::LlmResponse;
use crate::util::retry_with_backoff;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);
const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: &str, base_url: &str, model: &str) -> LlmResult<Self> {
        if api_key.is_empty() {
            return Err(LlmError::NotConfigured(
                "OPENAI_API_KEY is not set".to_string(),
            ));
        }
        Ok(Self {
            client: Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    async fn request(&self, prompt: &str, max_tokens: u32) -> LlmResult<LlmResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let content = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| LlmError::Parse("missing completion content".to_string()))?
            .to_string();

        let tokens_used = body
            .get("usage")
            .and_then(|u| u.get("total_tokens"))
            .and_then(|t| t.as_u64())
            .unwrap_or(0);

        Ok(LlmResponse {
            content,
            model: self.model.clone(),
            tokens_used,
        })
    }

    /// Generate text, retrying transient API failures.
    pub async fn generate(&self, prompt: &str, max_tokens: u32) -> LlmResult<LlmResponse> {
        retry_with_backoff(
            || self.request(prompt, max_tokens),
            RETRY_ATTEMPTS,
            RETRY_BASE_DELAY,
        )
        .await
    }
}
