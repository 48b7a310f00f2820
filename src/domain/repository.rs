// src/domain/repository.rs
// Collaborator interfaces. One implementation per external service lives in
// the infrastructure layer; services receive these as Arc trait objects
// constructed once at startup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::{
    ExecutionResult, LlmResult, MarketResult, NotifyResult, StoreResult,
};
use crate::domain::models::{
    LlmResponse, MarketSnapshot, SwapQuote, SwapTransaction, Trade, TradeAnalysis, TradingSignal,
};

/// Market data collaborator: live prices and 24h statistics.
#[async_trait]
pub trait MarketDataRepository: Send + Sync {
    /// Current USD price for a token mint, or `None` when the feed has no
    /// quote for it.
    async fn get_price(&self, token_mint: &str) -> MarketResult<Option<f64>>;

    /// Comprehensive snapshot: price is mandatory, volume/change/cap/liquidity
    /// are best-effort and may be absent.
    async fn get_comprehensive(
        &self,
        token_address: &str,
        token_symbol: &str,
    ) -> MarketResult<Option<MarketSnapshot>>;
}

/// Swap routing collaborator (DEX aggregator).
#[async_trait]
pub trait SwapRouteRepository: Send + Sync {
    /// Quote a swap. `Ok(None)` means no route exists for the pair/amount.
    async fn quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u16,
    ) -> ExecutionResult<Option<SwapQuote>>;

    /// Build an unsigned swap transaction from a previously obtained quote.
    async fn build_swap(
        &self,
        quote: &SwapQuote,
        user_public_key: &str,
    ) -> ExecutionResult<Option<SwapTransaction>>;
}

/// Chain RPC collaborator.
#[async_trait]
pub trait ChainRepository: Send + Sync {
    /// Native balance for an address, in SOL.
    async fn get_balance(&self, address: &str) -> ExecutionResult<f64>;

    /// Submit a signed, base64-encoded transaction. Returns the signature.
    async fn submit_transaction(&self, signed_tx: &str) -> ExecutionResult<Option<String>>;

    async fn latest_blockhash(&self) -> ExecutionResult<String>;
}

/// Transaction signing seam. Kept separate from `ChainRepository` so the
/// executor can run without credentials in paper mode.
pub trait WalletSigner: Send + Sync {
    /// Base58 public key of the signing account.
    fn address(&self) -> &str;

    /// Sign a base64-encoded serialized transaction, returning the signed
    /// transaction re-encoded as base64.
    fn sign_transaction(&self, transaction_b64: &str) -> ExecutionResult<String>;
}

/// LLM collaborator capability surface. The concrete provider is a closed
/// set selected once at startup from configuration.
#[async_trait]
pub trait LlmAnalyzer: Send + Sync {
    /// Free-form text generation.
    async fn generate(&self, prompt: &str, max_tokens: u32) -> LlmResult<LlmResponse>;

    /// Generate a JSON object; the prompt must spell out the expected schema.
    async fn generate_json(&self, prompt: &str, max_tokens: u32) -> LlmResult<serde_json::Value>;

    /// Produce a structured trading analysis from a fully built prompt. Any
    /// schema deviation in the response is an error, never a partial result.
    async fn analyze_signal(&self, prompt: &str) -> LlmResult<TradeAnalysis>;
}

/// Append-only signal store.
#[async_trait]
pub trait SignalRepository: Send + Sync {
    async fn insert_signal(&self, signal: &TradingSignal) -> StoreResult<i64>;

    /// Most recent signals, newest first, optionally filtered by token.
    async fn recent_signals(
        &self,
        token_address: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<TradingSignal>>;
}

/// Append-only trade store.
#[async_trait]
pub trait TradeRepository: Send + Sync {
    async fn insert_trade(&self, trade: &Trade) -> StoreResult<i64>;

    /// Most recent trades, newest first, optionally filtered by token.
    async fn recent_trades(
        &self,
        token_address: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<Trade>>;

    /// Executed trades in chronological order, bounded to the most recent
    /// `limit`. Used for position derivation.
    async fn executed_trades(&self, limit: usize) -> StoreResult<Vec<Trade>>;

    /// Executed trades at or after the given instant.
    async fn executed_trades_since(&self, since: DateTime<Utc>) -> StoreResult<Vec<Trade>>;
}

/// Outbound notification channel. Delivery is fire-and-forget: callers log
/// failures and never propagate them.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn notify_signal(&self, signal: &TradingSignal) -> NotifyResult<()>;

    async fn notify_trade(&self, trade: &Trade) -> NotifyResult<()>;
}
