// src/main.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::signal::ctrl_c;
use tokio::time::{interval, Duration};

use soltrader::application::{
    PortfolioService, RiskValidator, SignalService, TradeExecutor, TradingService,
};
use soltrader::config::Config;
use soltrader::domain::errors::AppResult;
use soltrader::domain::models::{PriceSample, TradeAction, TradeType};
use soltrader::domain::repository::{
    ChainRepository, MarketDataRepository, Notifier, SignalRepository, TradeRepository,
    WalletSigner,
};
use soltrader::infrastructure::chain::{SolanaRpcClient, Wallet};
use soltrader::infrastructure::llm::LlmClient;
use soltrader::infrastructure::market::JupiterMarketData;
use soltrader::infrastructure::notify::{DiscordNotifier, TelegramNotifier};
use soltrader::infrastructure::persistence::SqliteStore;
use soltrader::infrastructure::routing::JupiterSwapClient;

/// How many price samples per token the bot keeps for indicator input.
const PRICE_HISTORY_LIMIT: usize = 200;

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    config.init_logging();

    log::info!("Starting soltrader v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Environment: {:?}", config.environment);

    if config.watchlist.is_empty() {
        log::warn!("WATCH_TOKENS is empty; nothing to trade");
    }

    // Collaborators, constructed once and shared
    let market: Arc<dyn MarketDataRepository> = Arc::new(JupiterMarketData::new(&config.jupiter));
    let routing = Arc::new(JupiterSwapClient::new(&config.jupiter));
    let chain: Arc<dyn ChainRepository> = Arc::new(SolanaRpcClient::new(&config.solana.rpc_url));
    let llm = Arc::new(LlmClient::from_config(&config.llm)?);

    let store = Arc::new(SqliteStore::open(&config.database_path)?);
    let signals: Arc<dyn SignalRepository> = store.clone();
    let trades: Arc<dyn TradeRepository> = store;

    let wallet: Option<Arc<dyn WalletSigner>> = if config.solana.wallet_private_key.is_empty() {
        log::warn!("No wallet key configured; live execution disabled");
        None
    } else {
        let wallet = Wallet::from_base58(&config.solana.wallet_private_key)?;
        log::info!("Wallet loaded: {}", wallet.address());
        Some(Arc::new(wallet))
    };
    let wallet_address = wallet.as_ref().map(|w| w.address().to_string());

    let notifiers: Vec<Arc<dyn Notifier>> = vec![
        Arc::new(TelegramNotifier::new(&config.notifications)),
        Arc::new(DiscordNotifier::new(&config.notifications)),
    ];

    // Services
    let signal_service = SignalService::new(
        market.clone(),
        llm,
        signals,
        notifiers.clone(),
    );
    let risk = RiskValidator::new(config.trading.clone(), config.environment);
    let executor = TradeExecutor::new(
        routing,
        chain.clone(),
        wallet,
        config.environment,
        config.trading.trade_slippage,
    );
    let trading_service = TradingService::new(
        executor,
        RiskValidator::new(config.trading.clone(), config.environment),
        chain.clone(),
        trades.clone(),
        notifiers,
        wallet_address.clone(),
        config.trading.max_daily_loss,
    );
    let portfolio_service = PortfolioService::new(
        market.clone(),
        chain,
        trades,
        wallet_address,
        config.trading.max_open_positions,
    );

    log::info!(
        "Bot is running with {} watched tokens. Press Ctrl+C to stop.",
        config.watchlist.len()
    );

    let mut price_history: HashMap<String, Vec<PriceSample>> = HashMap::new();
    let mut ticker = interval(Duration::from_secs(config.trading.trade_interval_secs));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = run_cycle(
                    &config,
                    market.as_ref(),
                    &signal_service,
                    &risk,
                    &trading_service,
                    &portfolio_service,
                    &mut price_history,
                ).await {
                    log::error!("Trading cycle failed: {}", e);
                }
            }
            _ = ctrl_c() => {
                break;
            }
        }
    }

    log::info!("Shutting down...");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_cycle(
    config: &Config,
    market: &dyn MarketDataRepository,
    signal_service: &SignalService,
    risk: &RiskValidator,
    trading_service: &TradingService,
    portfolio_service: &PortfolioService,
    price_history: &mut HashMap<String, Vec<PriceSample>>,
) -> AppResult<()> {
    let portfolio = portfolio_service.get_portfolio().await?;
    log::info!(
        "Portfolio: ${:.2} total, {:.4} SOL available, {} positions, PnL ${:+.2}",
        portfolio.total_value_usd,
        portfolio.available_balance_sol,
        portfolio.positions.len(),
        portfolio.unrealized_pnl_usd
    );

    let daily = portfolio_service.daily_pnl().await?;
    if trading_service.should_stop_trading(&daily, portfolio.total_value_usd) {
        log::warn!(
            "Daily loss limit reached (${:+.2}); skipping this cycle",
            daily.pnl_usd
        );
        return Ok(());
    }

    for token in &config.watchlist {
        // Sampled price history feeds the indicator engine
        match market.get_price(&token.address).await {
            Ok(Some(price)) => {
                let history = price_history.entry(token.address.clone()).or_default();
                history.push(PriceSample {
                    price,
                    high: None,
                    low: None,
                    timestamp: Utc::now(),
                });
                if history.len() > PRICE_HISTORY_LIMIT {
                    history.remove(0);
                }
            }
            Ok(None) => {
                log::warn!("No price for {}; skipping", token.symbol);
                continue;
            }
            Err(e) => {
                log::warn!("Price fetch failed for {}: {}", token.symbol, e);
                continue;
            }
        }

        let history = price_history.get(&token.address).cloned().unwrap_or_default();
        let signal = match signal_service
            .generate_signal(&token.address, &token.symbol, &history, None)
            .await
        {
            Ok(signal) => signal,
            Err(e) => {
                log::error!("Signal generation failed for {}: {}", token.symbol, e);
                continue;
            }
        };

        if let Err(reason) = risk.should_execute(&signal) {
            log::info!("Not trading {}: {}", token.symbol, reason);
            continue;
        }

        let (trade_type, amount) = match signal.action {
            TradeAction::Buy => (
                TradeType::Buy,
                portfolio.available_balance_sol * config.trading.max_position_size,
            ),
            TradeAction::Sell => {
                let Some(position) = portfolio
                    .positions
                    .iter()
                    .find(|p| p.token_address == token.address)
                else {
                    log::info!("No open position in {} to sell", token.symbol);
                    continue;
                };
                (TradeType::Sell, position.amount)
            }
            TradeAction::Hold => continue,
        };

        match trading_service
            .execute_trade_with_validation(
                &token.address,
                &token.symbol,
                amount,
                trade_type,
                signal.id,
            )
            .await
        {
            Ok(trade) => {
                log::info!(
                    "Trade {} for {}: {} ({:?})",
                    trade.id.unwrap_or_default(),
                    token.symbol,
                    trade.status,
                    trade.signature
                );
            }
            Err(e) => {
                log::error!("Trade failed for {}: {}", token.symbol, e);
            }
        }
    }

    Ok(())
}
