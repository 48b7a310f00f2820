// src/infrastructure/routing/mod.rs
// Jupiter v6 aggregator client: /quote and /swap.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::JupiterConfig;
use crate::domain::errors::{ExecutionError, ExecutionResult};
use crate::domain::models::{SwapQuote, SwapTransaction};
use crate::domain::repository::SwapRouteRepository;
use crate::util::retry_with_backoff;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Subset of the /quote response we interpret. The full payload is kept
/// untouched in `SwapQuote::raw` because /swap requires it verbatim.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    input_mint: String,
    output_mint: String,
    in_amount: String,
    out_amount: String,
    #[serde(default)]
    price_impact_pct: Option<String>,
    #[serde(default)]
    route_plan: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SwapRequest<'a> {
    quote_response: &'a serde_json::Value,
    user_public_key: &'a str,
    wrap_and_unwrap_sol: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapResponse {
    swap_transaction: String,
    #[serde(default)]
    last_valid_block_height: u64,
}

pub struct JupiterSwapClient {
    client: Client,
    api_url: String,
}

impl JupiterSwapClient {
    pub fn new(config: &JupiterConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_url: config.api_url.clone(),
        }
    }

    async fn fetch_quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u16,
    ) -> ExecutionResult<Option<SwapQuote>> {
        let url = format!("{}/quote", self.api_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("inputMint", input_mint),
                ("outputMint", output_mint),
                ("amount", &amount.to_string()),
                ("slippageBps", &slippage_bps.to_string()),
            ])
            .send()
            .await?;

        // Jupiter answers 400/404 when the pair has no route; that is a
        // domain outcome, not a transport failure.
        if !response.status().is_success() {
            log::debug!(
                "No quote for {} -> {} ({} lamports): HTTP {}",
                input_mint,
                output_mint,
                amount,
                response.status()
            );
            return Ok(None);
        }

        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ExecutionError::Request(e.to_string()))?;

        let parsed: QuoteResponse = serde_json::from_value(raw.clone())
            .map_err(|e| ExecutionError::Request(format!("malformed quote response: {}", e)))?;

        let in_amount = parsed
            .in_amount
            .parse::<u64>()
            .map_err(|e| ExecutionError::Request(format!("bad inAmount: {}", e)))?;
        let out_amount = parsed
            .out_amount
            .parse::<u64>()
            .map_err(|e| ExecutionError::Request(format!("bad outAmount: {}", e)))?;

        let price_impact_pct = parsed
            .price_impact_pct
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0);

        Ok(Some(SwapQuote {
            input_mint: parsed.input_mint,
            output_mint: parsed.output_mint,
            in_amount,
            out_amount,
            price_impact_pct,
            route_hops: parsed.route_plan.len(),
            raw,
        }))
    }
}

#[async_trait]
impl SwapRouteRepository for JupiterSwapClient {
    async fn quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u16,
    ) -> ExecutionResult<Option<SwapQuote>> {
        retry_with_backoff(
            || self.fetch_quote(input_mint, output_mint, amount, slippage_bps),
            RETRY_ATTEMPTS,
            RETRY_BASE_DELAY,
        )
        .await
    }

    async fn build_swap(
        &self,
        quote: &SwapQuote,
        user_public_key: &str,
    ) -> ExecutionResult<Option<SwapTransaction>> {
        retry_with_backoff(
            || self.post_swap(quote, user_public_key),
            RETRY_ATTEMPTS,
            RETRY_BASE_DELAY,
        )
        .await
    }
}

impl JupiterSwapClient {
    async fn post_swap(
        &self,
        quote: &SwapQuote,
        user_public_key: &str,
    ) -> ExecutionResult<Option<SwapTransaction>> {
        let url = format!("{}/swap", self.api_url);
        let request = SwapRequest {
            quote_response: &quote.raw,
            user_public_key,
            wrap_and_unwrap_sol: true,
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            log::warn!("Swap build failed: HTTP {} {}", status, body);
            return Ok(None);
        }

        let parsed: SwapResponse = response
            .json()
            .await
            .map_err(|e| ExecutionError::Build(format!("malformed swap response: {}", e)))?;

        Ok(Some(SwapTransaction {
            swap_transaction: parsed.swap_transaction,
            last_valid_block_height: parsed.last_valid_block_height,
        }))
    }
}
