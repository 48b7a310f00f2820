// src/config.rs
use crate::domain::errors::{AppError, AppResult};
use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use std::env;

/// Deployment environment. Paper trading records trade intents without
/// submitting real transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    PaperTrading,
    Production,
}

impl Environment {
    fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" => Environment::Production,
            "paper_trading" => Environment::PaperTrading,
            _ => Environment::Development,
        }
    }

    pub fn is_paper_trading(&self) -> bool {
        matches!(self, Environment::PaperTrading)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// LLM provider selection. The concrete client is chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Anthropic,
    OpenAi,
}

/// Trading bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Solana RPC and wallet
    pub solana: SolanaConfig,

    /// Jupiter aggregator API
    pub jupiter: JupiterConfig,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Trading and risk parameters
    pub trading: TradingConfig,

    /// Notification channels
    pub notifications: NotificationConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Deployment environment
    pub environment: Environment,

    /// SQLite database path
    pub database_path: String,

    /// Tokens the bot monitors and trades
    pub watchlist: Vec<WatchedToken>,
}

/// One monitored token, parsed from `WATCH_TOKENS` ("SYMBOL:mint,...").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchedToken {
    pub symbol: String,
    pub address: String,
}

fn parse_watchlist(raw: &str) -> Vec<WatchedToken> {
    raw.split(',')
        .filter_map(|entry| {
            let (symbol, address) = entry.trim().split_once(':')?;
            if symbol.is_empty() || address.is_empty() {
                return None;
            }
            Some(WatchedToken {
                symbol: symbol.to_string(),
                address: address.to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolanaConfig {
    /// RPC endpoint URL
    pub rpc_url: String,

    /// Base58-encoded wallet private key; empty disables live execution
    pub wallet_private_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JupiterConfig {
    /// Quote/swap API base URL
    pub api_url: String,

    /// Price API base URL
    pub price_api_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub anthropic_api_key: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Maximum position size as a fraction of portfolio balance
    pub max_position_size: f64,

    /// Daily loss limit as a fraction of portfolio value
    pub max_daily_loss: f64,

    /// Allowed slippage as a fraction (0.01 = 1%)
    pub trade_slippage: f64,

    /// Minimum trade amount in SOL
    pub min_trade_amount_sol: f64,

    /// SOL balance that must stay in the wallet after any trade
    pub reserve_balance_sol: f64,

    /// Maximum number of open positions reported by the valuator
    pub max_open_positions: usize,

    /// Seconds between trading cycles
    pub trade_interval_secs: u64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            max_position_size: 0.05,
            max_daily_loss: 0.02,
            trade_slippage: 0.01,
            min_trade_amount_sol: 0.01,
            reserve_balance_sol: 0.01,
            max_open_positions: 10,
            trade_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub discord_webhook_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "warn", "error")
    pub level: String,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> AppResult<Self> {
        dotenv().ok();

        let solana = SolanaConfig {
            rpc_url: env::var("SOLANA_RPC_URL").map_err(|_| {
                AppError::Config("Missing SOLANA_RPC_URL environment variable".to_string())
            })?,
            wallet_private_key: env_or("SOLANA_WALLET_PRIVATE_KEY", ""),
        };

        let jupiter = JupiterConfig {
            api_url: env_or("JUPITER_API_URL", "https://quote-api.jup.ag/v6"),
            price_api_url: env_or("JUPITER_PRICE_API_URL", "https://price.jup.ag/v6"),
        };

        let provider = match env_or("LLM_PROVIDER", "anthropic").to_lowercase().as_str() {
            "openai" => LlmProvider::OpenAi,
            _ => LlmProvider::Anthropic,
        };

        let llm = LlmConfig {
            provider,
            model: env_or("LLM_MODEL", "claude-3-5-sonnet-20241022"),
            anthropic_api_key: env_or("ANTHROPIC_API_KEY", ""),
            openai_api_key: env_or("OPENAI_API_KEY", ""),
            openai_base_url: env_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
        };

        let trading = TradingConfig {
            max_position_size: env_parse("MAX_POSITION_SIZE", 0.05),
            max_daily_loss: env_parse("MAX_DAILY_LOSS", 0.02),
            trade_slippage: env_parse("TRADE_SLIPPAGE", 0.01),
            min_trade_amount_sol: env_parse("MIN_TRADE_AMOUNT_SOL", 0.01),
            reserve_balance_sol: env_parse("RESERVE_BALANCE_SOL", 0.01),
            max_open_positions: env_parse("MAX_OPEN_POSITIONS", 10),
            trade_interval_secs: env_parse("TRADE_INTERVAL_SECS", 300),
        };

        let notifications = NotificationConfig {
            telegram_bot_token: env_or("TELEGRAM_BOT_TOKEN", ""),
            telegram_chat_id: env_or("TELEGRAM_CHAT_ID", ""),
            discord_webhook_url: env_or("DISCORD_WEBHOOK_URL", ""),
        };

        let logging = LoggingConfig {
            level: env_or("LOG_LEVEL", "info"),
        };

        Ok(Config {
            solana,
            jupiter,
            llm,
            trading,
            notifications,
            logging,
            environment: Environment::parse(&env_or("ENVIRONMENT", "development")),
            database_path: env_or("DATABASE_PATH", "soltrader.db"),
            watchlist: parse_watchlist(&env_or("WATCH_TOKENS", "")),
        })
    }

    /// Initialize logging based on configuration
    pub fn init_logging(&self) {
        let log_level = match self.logging.level.to_lowercase().as_str() {
            "trace" => log::LevelFilter::Trace,
            "debug" => log::LevelFilter::Debug,
            "warn" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            _ => log::LevelFilter::Info,
        };

        env_logger::Builder::new().filter_level(log_level).init();
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            solana: SolanaConfig {
                rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
                wallet_private_key: String::new(),
            },
            jupiter: JupiterConfig {
                api_url: "https://quote-api.jup.ag/v6".to_string(),
                price_api_url: "https://price.jup.ag/v6".to_string(),
            },
            llm: LlmConfig {
                provider: LlmProvider::Anthropic,
                model: "claude-3-5-sonnet-20241022".to_string(),
                anthropic_api_key: String::new(),
                openai_api_key: String::new(),
                openai_base_url: "https://api.openai.com/v1".to_string(),
            },
            trading: TradingConfig::default(),
            notifications: NotificationConfig {
                telegram_bot_token: String::new(),
                telegram_chat_id: String::new(),
                discord_webhook_url: String::new(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            environment: Environment::Development,
            database_path: "soltrader.db".to_string(),
            watchlist: Vec::new(),
        }
    }
}
