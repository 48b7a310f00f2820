// src/domain/mod.rs
pub mod errors;
pub mod models;
pub mod repository;

// Re-export common types for convenience
pub use errors::{
    AppError, AppResult, ExecutionError, ExecutionResult, LlmError, LlmResult, MarketError,
    MarketResult, NotifyError, NotifyResult, StoreError, StoreResult, TradingError, TradingResult,
};
pub use models::{
    DailyPnl, LlmResponse, MarketSnapshot, Portfolio, Position, PriceSample, RiskLevel,
    SignalStrength, SwapPreview, SwapQuote, SwapTransaction, Trade, TradeAction, TradeAnalysis,
    TradeStatus, TradeType, TradingSignal,
};
