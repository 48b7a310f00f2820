// src/infrastructure/llm/mod.rs
// Provider selection and strict response parsing. The provider set is
// closed: each variant is a separately configured client.

pub mod claude;
pub mod openai;
pub mod prompts;

pub use claude::ClaudeClient;
pub use openai::OpenAiClient;

use async_trait::async_trait;

use crate::config::{LlmConfig, LlmProvider};
use crate::domain::errors::{LlmError, LlmResult};
use crate::domain::models::{LlmResponse, TradeAnalysis};
use crate::domain::repository::LlmAnalyzer;

const ANALYSIS_MAX_TOKENS: u32 = 1500;

const JSON_INSTRUCTION: &str = "\n\nIMPORTANT: Respond ONLY with a valid JSON object. \
Do not include any explanatory text before or after the JSON.";

pub enum LlmClient {
    Claude(ClaudeClient),
    OpenAi(OpenAiClient),
}

impl LlmClient {
    /// Construct the configured provider. Fails fast when the selected
    /// provider has no API key.
    pub fn from_config(config: &LlmConfig) -> LlmResult<Self> {
        match config.provider {
            LlmProvider::Anthropic => Ok(LlmClient::Claude(ClaudeClient::new(
                &config.anthropic_api_key,
                &config.model,
            )?)),
            LlmProvider::OpenAi => Ok(LlmClient::OpenAi(OpenAiClient::new(
                &config.openai_api_key,
                &config.openai_base_url,
                &config.model,
            )?)),
        }
    }
}

#[async_trait]
impl LlmAnalyzer for LlmClient {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> LlmResult<LlmResponse> {
        match self {
            LlmClient::Claude(c) => c.generate(prompt, max_tokens).await,
            LlmClient::OpenAi(c) => c.generate(prompt, max_tokens).await,
        }
    }

    async fn generate_json(&self, prompt: &str, max_tokens: u32) -> LlmResult<serde_json::Value> {
        let json_prompt = format!("{}{}", prompt, JSON_INSTRUCTION);
        let response = self.generate(&json_prompt, max_tokens).await?;
        let stripped = strip_code_fences(&response.content);
        serde_json::from_str(stripped)
            .map_err(|e| LlmError::Parse(format!("response is not valid JSON: {}", e)))
    }

    async fn analyze_signal(&self, prompt: &str) -> LlmResult<TradeAnalysis> {
        let value = self.generate_json(prompt, ANALYSIS_MAX_TOKENS).await?;
        parse_trade_analysis(value)
    }
}

/// Strip a surrounding markdown code fence, with or without a language tag.
/// Anything else is returned trimmed but untouched.
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Validate a parsed response against the analysis schema. Every deviation
/// is a hard failure; there are no partial analyses.
pub fn parse_trade_analysis(value: serde_json::Value) -> LlmResult<TradeAnalysis> {
    let analysis: TradeAnalysis = serde_json::from_value(value)
        .map_err(|e| LlmError::SchemaViolation(e.to_string()))?;

    if !(0.0..=1.0).contains(&analysis.confidence) {
        return Err(LlmError::SchemaViolation(format!(
            "confidence {} outside [0, 1]",
            analysis.confidence
        )));
    }
    if analysis.reasoning.trim().is_empty() {
        return Err(LlmError::SchemaViolation("empty reasoning".to_string()));
    }

    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{RiskLevel, SignalStrength, TradeAction};
    use serde_json::json;

    fn valid_analysis() -> serde_json::Value {
        json!({
            "action": "buy",
            "strength": "strong",
            "confidence": 0.82,
            "risk_level": "medium",
            "reasoning": "Uptrend with RSI confirmation",
            "entry_price": 1.23,
            "stop_loss": 1.10,
            "take_profit": 1.50,
            "position_size_percent": 3.0
        })
    }

    #[test]
    fn parses_valid_analysis() {
        let analysis = parse_trade_analysis(valid_analysis()).unwrap();
        assert_eq!(analysis.action, TradeAction::Buy);
        assert_eq!(analysis.strength, SignalStrength::Strong);
        assert_eq!(analysis.risk_level, RiskLevel::Medium);
        assert_eq!(analysis.entry_price, Some(1.23));
    }

    #[test]
    fn optional_fields_may_be_absent_or_null() {
        let value = json!({
            "action": "hold",
            "strength": "weak",
            "confidence": 0.4,
            "risk_level": "high",
            "reasoning": "Too uncertain",
            "entry_price": null
        });
        let analysis = parse_trade_analysis(value).unwrap();
        assert_eq!(analysis.entry_price, None);
        assert_eq!(analysis.take_profit, None);
    }

    #[test]
    fn rejects_unknown_action() {
        let mut value = valid_analysis();
        value["action"] = json!("yolo");
        assert!(matches!(
            parse_trade_analysis(value),
            Err(LlmError::SchemaViolation(_))
        ));
    }

    #[test]
    fn rejects_missing_required_field() {
        let mut value = valid_analysis();
        value.as_object_mut().unwrap().remove("confidence");
        assert!(parse_trade_analysis(value).is_err());
    }

    #[test]
    fn rejects_string_confidence() {
        let mut value = valid_analysis();
        value["confidence"] = json!("0.8");
        assert!(matches!(
            parse_trade_analysis(value),
            Err(LlmError::SchemaViolation(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let mut value = valid_analysis();
        value["confidence"] = json!(1.4);
        assert!(parse_trade_analysis(value).is_err());
    }

    #[test]
    fn strips_markdown_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }
}
