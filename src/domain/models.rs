// src/domain/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wrapped SOL mint address.
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Sentinel signature recorded for simulated (paper) trades.
pub const PAPER_TRADE_SIGNATURE: &str = "paper_trade_simulated";

/// Core Trading Components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "buy",
            TradeAction::Sell => "sell",
            TradeAction::Hold => "hold",
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordinal strength of a trading signal, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStrength {
    VeryWeak,
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}

impl SignalStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalStrength::VeryWeak => "very_weak",
            SignalStrength::Weak => "weak",
            SignalStrength::Moderate => "moderate",
            SignalStrength::Strong => "strong",
            SignalStrength::VeryStrong => "very_strong",
        }
    }
}

impl fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Buy,
    Sell,
}

impl TradeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Buy => "buy",
            TradeType::Sell => "sell",
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trade lifecycle status. Transitions only move forward; a trade returned
/// from the executor is always in a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Pending,
    Executed,
    Failed,
    Cancelled,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Pending => "pending",
            TradeStatus::Executed => "executed",
            TradeStatus::Failed => "failed",
            TradeStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TradeStatus::Pending)
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One observation in a historical price series. `high`/`low` fall back to
/// `price` when the data source does not supply them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSample {
    pub price: f64,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl PriceSample {
    pub fn high(&self) -> f64 {
        self.high.unwrap_or(self.price)
    }

    pub fn low(&self) -> f64 {
        self.low.unwrap_or(self.price)
    }
}

/// LLM-generated trading recommendation. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingSignal {
    pub id: Option<i64>,
    pub token_address: String,
    pub token_symbol: String,
    pub action: TradeAction,
    pub strength: SignalStrength,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub reasoning: String,
    pub entry_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Trade record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: Option<i64>,
    pub trade_type: TradeType,
    pub token_address: String,
    pub token_symbol: String,
    pub amount: f64,
    pub price: f64,
    pub value_usd: f64,
    pub status: TradeStatus,
    pub signature: Option<String>,
    pub signal_id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

/// Open holding derived from trade history; recomputed on every portfolio
/// query, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub token_address: String,
    pub token_symbol: String,
    pub amount: f64,
    pub average_entry_price: f64,
    pub current_price: f64,
    pub value_usd: f64,
    pub pnl_usd: f64,
    pub pnl_percentage: f64,
    pub opened_at: DateTime<Utc>,
}

/// Point-in-time account snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub total_value_usd: f64,
    pub available_balance_sol: f64,
    pub positions: Vec<Position>,
    pub unrealized_pnl_usd: f64,
    pub unrealized_pnl_percentage: f64,
}

/// Market Data Structures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub token_address: String,
    pub token_symbol: String,
    pub price: f64,
    pub volume_24h: f64,
    pub price_change_24h: f64,
    pub market_cap: Option<f64>,
    pub liquidity_usd: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Price quote for a swap route. `raw` keeps the untouched quote payload so
/// it can be passed back verbatim when requesting the swap transaction.
#[derive(Debug, Clone)]
pub struct SwapQuote {
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount: u64,
    pub out_amount: u64,
    pub price_impact_pct: f64,
    pub route_hops: usize,
    pub raw: serde_json::Value,
}

/// Prepared, unsigned swap transaction from the routing collaborator.
#[derive(Debug, Clone)]
pub struct SwapTransaction {
    pub swap_transaction: String,
    pub last_valid_block_height: u64,
}

/// Result of a dry-run quote, for previewing a swap without committing.
#[derive(Debug, Clone, Serialize)]
pub struct SwapPreview {
    pub input_amount: f64,
    pub output_amount: f64,
    pub price_impact_pct: f64,
    pub route_count: usize,
}

/// Parsed LLM trading analysis. Field set mirrors the output schema the
/// prompt demands; enum fields reject any value outside the declared sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeAnalysis {
    pub action: TradeAction,
    pub strength: SignalStrength,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub reasoning: String,
    #[serde(default)]
    pub entry_price: Option<f64>,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub take_profit: Option<f64>,
    #[serde(default)]
    pub position_size_percent: Option<f64>,
}

/// Raw completion from an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub tokens_used: u64,
}

/// Daily trading statistics derived from executed trades.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DailyPnl {
    pub total_bought_usd: f64,
    pub total_sold_usd: f64,
    pub pnl_usd: f64,
    pub trade_count: usize,
}

pub fn sol_to_lamports(amount: f64) -> u64 {
    (amount * LAMPORTS_PER_SOL as f64) as u64
}

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}
