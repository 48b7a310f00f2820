// src/application/mod.rs
pub mod executor;
pub mod portfolio;
pub mod risk;
pub mod signal_service;
pub mod trading_service;

pub use executor::TradeExecutor;
pub use portfolio::PortfolioService;
pub use risk::RiskValidator;
pub use signal_service::SignalService;
pub use trading_service::TradingService;
