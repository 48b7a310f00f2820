// src/infrastructure/market/mod.rs
// Market data repository backed by the Jupiter price API, with DexScreener
// supplying 24h statistics on a best-effort basis.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::time::Duration;

use crate::config::JupiterConfig;
use crate::domain::errors::{MarketError, MarketResult};
use crate::domain::models::MarketSnapshot;
use crate::domain::repository::MarketDataRepository;
use crate::util::retry_with_backoff;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

const DEXSCREENER_TOKENS_URL: &str = "https://api.dexscreener.com/latest/dex/tokens";

pub struct JupiterMarketData {
    client: Client,
    price_api_url: String,
}

impl JupiterMarketData {
    pub fn new(config: &JupiterConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            price_api_url: config.price_api_url.clone(),
        }
    }

    async fn fetch_price(&self, token_mint: &str) -> MarketResult<Option<f64>> {
        let url = format!("{}/price", self.price_api_url);
        let response = self
            .client
            .get(&url)
            .query(&[("ids", token_mint)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MarketError::Request(format!(
                "price API returned {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| MarketError::Parse(e.to_string()))?;

        // The v6 price API nests entries under "data"; tolerate both shapes.
        let entry = body
            .get("data")
            .and_then(|d| d.get(token_mint))
            .or_else(|| body.get(token_mint));

        Ok(entry.and_then(|e| e.get("price")).and_then(|p| p.as_f64()))
    }

    /// Most liquid DexScreener pair for a token, or `None` when the token is
    /// unknown there. Failures here never fail a snapshot.
    async fn fetch_dex_screener_pair(
        &self,
        token_address: &str,
    ) -> MarketResult<Option<serde_json::Value>> {
        let url = format!("{}/{}", DEXSCREENER_TOKENS_URL, token_address);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(MarketError::Request(format!(
                "DexScreener returned {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| MarketError::Parse(e.to_string()))?;

        let mut pairs: Vec<serde_json::Value> = match body.get("pairs").and_then(|p| p.as_array()) {
            Some(pairs) if !pairs.is_empty() => pairs.clone(),
            _ => return Ok(None),
        };

        pairs.sort_by(|a, b| {
            let liq = |v: &serde_json::Value| {
                v.get("liquidity")
                    .and_then(|l| l.get("usd"))
                    .and_then(|u| u.as_f64())
                    .unwrap_or(0.0)
            };
            liq(b).partial_cmp(&liq(a)).unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(pairs.into_iter().next())
    }
}

#[async_trait]
impl MarketDataRepository for JupiterMarketData {
    async fn get_price(&self, token_mint: &str) -> MarketResult<Option<f64>> {
        retry_with_backoff(
            || self.fetch_price(token_mint),
            RETRY_ATTEMPTS,
            RETRY_BASE_DELAY,
        )
        .await
    }

    async fn get_comprehensive(
        &self,
        token_address: &str,
        token_symbol: &str,
    ) -> MarketResult<Option<MarketSnapshot>> {
        let price = match self.get_price(token_address).await? {
            Some(price) => price,
            None => return Ok(None),
        };

        let mut volume_24h = 0.0;
        let mut price_change_24h = 0.0;
        let mut market_cap = None;
        let mut liquidity_usd = None;

        match self.fetch_dex_screener_pair(token_address).await {
            Ok(Some(pair)) => {
                volume_24h = pair
                    .get("volume")
                    .and_then(|v| v.get("h24"))
                    .and_then(|v| v.as_f64())
                    .unwrap_or(0.0);
                price_change_24h = pair
                    .get("priceChange")
                    .and_then(|v| v.get("h24"))
                    .and_then(|v| v.as_f64())
                    .unwrap_or(0.0);
                market_cap = pair.get("fdv").and_then(|v| v.as_f64());
                liquidity_usd = pair
                    .get("liquidity")
                    .and_then(|l| l.get("usd"))
                    .and_then(|u| u.as_f64());
            }
            Ok(None) => {}
            Err(e) => {
                log::warn!("DexScreener lookup failed for {}: {}", token_symbol, e);
            }
        }

        Ok(Some(MarketSnapshot {
            token_address: token_address.to_string(),
            token_symbol: token_symbol.to_string(),
            price,
            volume_24h,
            price_change_24h,
            market_cap,
            liquidity_usd,
            timestamp: Utc::now(),
        }))
    }
}
