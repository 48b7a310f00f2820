// src/infrastructure/llm/claude.rs
// Anthropic messages API client.

use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::domain::errors::{LlmError, LlmResult};
use crate::domain::models::LlmResponse;
use crate::util::retry_with_backoff;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);
const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

pub struct ClaudeClient {
    client: Client,
    api_key: String,
    model: String,
}

impl ClaudeClient {
    pub fn new(api_key: &str, model: &str) -> LlmResult<Self> {
        if api_key.is_empty() {
            return Err(LlmError::NotConfigured(
                "ANTHROPIC_API_KEY is not set".to_string(),
            ));
        }
        Ok(Self {
            client: Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    async fn request(&self, prompt: &str, max_tokens: u32) -> LlmResult<LlmResponse> {
        let body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
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
            .get("content")
            .and_then(|c| c.get(0))
            .and_then(|b| b.get("text"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| LlmError::Parse("missing content block".to_string()))?
            .to_string();

        let usage = body.get("usage");
        let tokens_used = usage
            .and_then(|u| u.get("input_tokens"))
            .and_then(|t| t.as_u64())
            .unwrap_or(0)
            + usage
                .and_then(|u| u.get("output_tokens"))
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
