// src/application/trading_service.rs
// Validated trade execution: size checks against the live balance, then
// the executor pipeline, then persistence and notification.

use std::sync::Arc;

use crate::application::executor::TradeExecutor;
use crate::application::risk::RiskValidator;
use crate::domain::errors::{AppResult, TradingError};
use crate::domain::models::{DailyPnl, Trade, TradeType};
use crate::domain::repository::{ChainRepository, Notifier, TradeRepository};

pub struct TradingService {
    executor: TradeExecutor,
    risk: RiskValidator,
    chain: Arc<dyn ChainRepository>,
    trades: Arc<dyn TradeRepository>,
    notifiers: Vec<Arc<dyn Notifier>>,
    wallet_address: Option<String>,
    max_daily_loss: f64,
}

impl TradingService {
    pub fn new(
        executor: TradeExecutor,
        risk: RiskValidator,
        chain: Arc<dyn ChainRepository>,
        trades: Arc<dyn TradeRepository>,
        notifiers: Vec<Arc<dyn Notifier>>,
        wallet_address: Option<String>,
        max_daily_loss: f64,
    ) -> Self {
        Self {
            executor,
            risk,
            chain,
            trades,
            notifiers,
            wallet_address,
            max_daily_loss,
        }
    }

    /// Validate a trade against the current balance, execute it, persist
    /// the terminal record and announce it. Every executed or failed trade
    /// ends up in the store; validation rejections leave no record.
    pub async fn execute_trade_with_validation(
        &self,
        token_mint: &str,
        token_symbol: &str,
        amount_sol: f64,
        trade_type: TradeType,
        signal_id: Option<i64>,
    ) -> AppResult<Trade> {
        let balance = match &self.wallet_address {
            Some(address) => self.chain.get_balance(address).await?,
            None => 0.0,
        };

        self.risk
            .validate_trade(amount_sol, balance)
            .map_err(TradingError::Validation)?;

        let mut trade = match trade_type {
            TradeType::Buy => {
                self.executor
                    .execute_buy(token_mint, token_symbol, amount_sol, signal_id)
                    .await?
            }
            TradeType::Sell => {
                self.executor
                    .execute_sell(token_mint, token_symbol, amount_sol, signal_id)
                    .await?
            }
        };

        let id = self.trades.insert_trade(&trade).await?;
        trade.id = Some(id);

        for notifier in &self.notifiers {
            if !notifier.is_configured() {
                continue;
            }
            if let Err(e) = notifier.notify_trade(&trade).await {
                log::warn!("Trade notification failed: {}", e);
            }
        }

        Ok(trade)
    }

    pub async fn trade_history(
        &self,
        token_address: Option<&str>,
        limit: usize,
    ) -> AppResult<Vec<Trade>> {
        Ok(self.trades.recent_trades(token_address, limit).await?)
    }

    /// Circuit breaker: stop trading once today's realized loss exceeds the
    /// configured fraction of portfolio value. A loss exactly at the limit
    /// keeps trading.
    pub fn should_stop_trading(&self, daily: &DailyPnl, portfolio_value_usd: f64) -> bool {
        daily.pnl_usd < -(portfolio_value_usd * self.max_daily_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, TradingConfig};
    use crate::domain::errors::{
        AppError, ExecutionError, ExecutionResult, NotifyResult, StoreResult,
    };
    use crate::domain::models::{
        SwapQuote, SwapTransaction, TradeStatus, TradingSignal, SOL_MINT,
    };
    use crate::domain::repository::{SwapRouteRepository, WalletSigner};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct MockRouting {
        has_route: bool,
    }

    #[async_trait]
    impl SwapRouteRepository for MockRouting {
        async fn quote(
            &self,
            _input_mint: &str,
            _output_mint: &str,
            amount: u64,
            _slippage_bps: u16,
        ) -> ExecutionResult<Option<SwapQuote>> {
            if !self.has_route {
                return Ok(None);
            }
            Ok(Some(SwapQuote {
                input_mint: SOL_MINT.to_string(),
                output_mint: "token".to_string(),
                in_amount: amount,
                out_amount: amount * 10,
                price_impact_pct: 0.0,
                route_hops: 1,
                raw: serde_json::json!({}),
            }))
        }

        async fn build_swap(
            &self,
            _quote: &SwapQuote,
            _user_public_key: &str,
        ) -> ExecutionResult<Option<SwapTransaction>> {
            Ok(Some(SwapTransaction {
                swap_transaction: "dHg=".to_string(),
                last_valid_block_height: 1,
            }))
        }
    }

    struct MockChain;

    #[async_trait]
    impl ChainRepository for MockChain {
        async fn get_balance(&self, _address: &str) -> ExecutionResult<f64> {
            Ok(10.0)
        }

        async fn submit_transaction(&self, _signed_tx: &str) -> ExecutionResult<Option<String>> {
            Ok(Some("sig".to_string()))
        }

        async fn latest_blockhash(&self) -> ExecutionResult<String> {
            Ok("hash".to_string())
        }
    }

    struct MockWallet;

    impl WalletSigner for MockWallet {
        fn address(&self) -> &str {
            "wallet"
        }

        fn sign_transaction(&self, tx: &str) -> ExecutionResult<String> {
            Ok(tx.to_string())
        }
    }

    #[derive(Default)]
    struct MockTrades {
        inserted: Mutex<Vec<Trade>>,
    }

    #[async_trait]
    impl TradeRepository for MockTrades {
        async fn insert_trade(&self, trade: &Trade) -> StoreResult<i64> {
            let mut inserted = self.inserted.lock().unwrap();
            inserted.push(trade.clone());
            Ok(inserted.len() as i64)
        }

        async fn recent_trades(
            &self,
            _token_address: Option<&str>,
            _limit: usize,
        ) -> StoreResult<Vec<Trade>> {
            Ok(self.inserted.lock().unwrap().clone())
        }

        async fn executed_trades(&self, _limit: usize) -> StoreResult<Vec<Trade>> {
            Ok(vec![])
        }

        async fn executed_trades_since(
            &self,
            _since: DateTime<Utc>,
        ) -> StoreResult<Vec<Trade>> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct MockNotifier {
        trade_count: AtomicU32,
    }

    #[async_trait]
    impl Notifier for MockNotifier {
        fn is_configured(&self) -> bool {
            true
        }

        async fn notify_signal(&self, _signal: &TradingSignal) -> NotifyResult<()> {
            Ok(())
        }

        async fn notify_trade(&self, _trade: &Trade) -> NotifyResult<()> {
            self.trade_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn service(has_route: bool) -> (TradingService, Arc<MockTrades>, Arc<MockNotifier>) {
        let trades = Arc::new(MockTrades::default());
        let notifier = Arc::new(MockNotifier::default());
        let executor = TradeExecutor::new(
            Arc::new(MockRouting { has_route }),
            Arc::new(MockChain),
            Some(Arc::new(MockWallet)),
            Environment::Development,
            0.01,
        );
        let risk = RiskValidator::new(TradingConfig::default(), Environment::Development);
        let service = TradingService::new(
            executor,
            risk,
            Arc::new(MockChain),
            trades.clone(),
            vec![notifier.clone()],
            Some("wallet".to_string()),
            0.02,
        );
        (service, trades, notifier)
    }

    #[tokio::test]
    async fn valid_trade_is_executed_persisted_and_announced() {
        let (service, trades, notifier) = service(true);

        let trade = service
            .execute_trade_with_validation("token", "TEST", 0.1, TradeType::Buy, Some(3))
            .await
            .unwrap();

        assert_eq!(trade.id, Some(1));
        assert_eq!(trade.status, TradeStatus::Executed);
        assert_eq!(trades.inserted.lock().unwrap().len(), 1);
        assert_eq!(notifier.trade_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn oversized_trade_is_rejected_before_execution() {
        let (service, trades, notifier) = service(true);

        // balance is 10 SOL, cap is 5% = 0.5 SOL
        let result = service
            .execute_trade_with_validation("token", "TEST", 1.0, TradeType::Buy, None)
            .await;

        assert!(matches!(
            result,
            Err(AppError::Trading(TradingError::Validation(_)))
        ));
        assert!(trades.inserted.lock().unwrap().is_empty());
        assert_eq!(notifier.trade_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn trade_exactly_at_position_cap_passes() {
        let (service, trades, _) = service(true);

        let trade = service
            .execute_trade_with_validation("token", "TEST", 0.5, TradeType::Buy, None)
            .await
            .unwrap();

        assert_eq!(trade.status, TradeStatus::Executed);
        assert_eq!(trades.inserted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn no_route_leaves_no_record() {
        let (service, trades, _) = service(false);

        let result = service
            .execute_trade_with_validation("token", "TEST", 0.1, TradeType::Sell, None)
            .await;

        assert!(matches!(
            result,
            Err(AppError::Execution(ExecutionError::NoRoute))
        ));
        assert!(trades.inserted.lock().unwrap().is_empty());
    }

    #[test]
    fn daily_loss_limit_is_exclusive() {
        let (service, _, _) = service(true);
        let at_limit = DailyPnl {
            pnl_usd: -20.0,
            ..Default::default()
        };
        let beyond = DailyPnl {
            pnl_usd: -20.01,
            ..Default::default()
        };
        // 2% of $1000 is $20
        assert!(!service.should_stop_trading(&at_limit, 1000.0));
        assert!(service.should_stop_trading(&beyond, 1000.0));
    }
}
