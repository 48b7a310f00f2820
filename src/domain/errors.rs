// src/domain/errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Market data error: {0}")]
    Market(#[from] MarketError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Trading error: {0}")]
    Trading(#[from] TradingError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Config(s)
    }
}

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("Request error: {0}")]
    Request(String),

    #[error("Invalid response: {0}")]
    Parse(String),

    #[error("No market data available for {0}")]
    NoData(String),
}

impl From<reqwest::Error> for MarketError {
    fn from(e: reqwest::Error) -> Self {
        MarketError::Request(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Response parse error: {0}")]
    Parse(String),

    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    #[error("LLM provider not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        LlmError::Api(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("No route available for swap")]
    NoRoute,

    #[error("Wallet not configured")]
    WalletNotConfigured,

    #[error("Invalid wallet key: {0}")]
    InvalidKey(String),

    #[error("Failed to build swap transaction: {0}")]
    Build(String),

    #[error("Transaction submission failed: {0}")]
    Submit(String),

    #[error("Chain RPC error: {0}")]
    Rpc(String),

    #[error("Request error: {0}")]
    Request(String),
}

impl From<reqwest::Error> for ExecutionError {
    fn from(e: reqwest::Error) -> Self {
        ExecutionError::Request(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum TradingError {
    #[error("Trade validation failed: {0}")]
    Validation(String),

    #[error("Signal generation failed: {0}")]
    Signal(String),

    #[error("Trade execution failed: {0}")]
    Execution(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Channel not configured")]
    NotConfigured,

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        NotifyError::Delivery(e.to_string())
    }
}

// Result type aliases for convenience
pub type AppResult<T> = Result<T, AppError>;
pub type MarketResult<T> = Result<T, MarketError>;
pub type LlmResult<T> = Result<T, LlmError>;
pub type ExecutionResult<T> = Result<T, ExecutionError>;
pub type TradingResult<T> = Result<T, TradingError>;
pub type StoreResult<T> = Result<T, StoreError>;
pub type NotifyResult<T> = Result<T, NotifyError>;
