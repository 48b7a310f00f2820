// src/application/portfolio.rs
// Portfolio valuation. Positions are derived from executed trade history by
// FIFO lot matching on every query; nothing positional is stored.

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::errors::AppResult;
use crate::domain::models::{DailyPnl, Portfolio, Position, Trade, TradeType, SOL_MINT};
use crate::domain::repository::{ChainRepository, MarketDataRepository, TradeRepository};

/// How many executed trades back the lot matcher looks.
const TRADE_HISTORY_WINDOW: usize = 200;

#[derive(Debug, Clone)]
struct Lot {
    amount: f64,
    price: f64,
    opened_at: DateTime<Utc>,
}

/// Net open holding for one token after lot matching.
#[derive(Debug, Clone)]
pub struct OpenHolding {
    pub token_address: String,
    pub token_symbol: String,
    pub amount: f64,
    pub average_entry_price: f64,
    pub opened_at: DateTime<Utc>,
}

/// Match sells against buys first-in-first-out and return what remains
/// open. Input must be in chronological order. Sells beyond the held
/// amount drain the token to zero and the excess is ignored.
fn open_holdings(trades: &[Trade]) -> Vec<OpenHolding> {
    let mut lots: HashMap<String, (String, Vec<Lot>)> = HashMap::new();

    for trade in trades {
        match trade.trade_type {
            TradeType::Buy => {
                let entry = lots
                    .entry(trade.token_address.clone())
                    .or_insert_with(|| (trade.token_symbol.clone(), Vec::new()));
                entry.1.push(Lot {
                    amount: trade.amount,
                    price: trade.price,
                    opened_at: trade.timestamp,
                });
            }
            TradeType::Sell => {
                let Some((_, token_lots)) = lots.get_mut(&trade.token_address) else {
                    continue;
                };
                let mut remaining = trade.amount;
                while remaining > 0.0 && !token_lots.is_empty() {
                    let lot = &mut token_lots[0];
                    if lot.amount > remaining {
                        lot.amount -= remaining;
                        remaining = 0.0;
                    } else {
                        remaining -= lot.amount;
                        token_lots.remove(0);
                    }
                }
            }
        }
    }

    let mut holdings: Vec<OpenHolding> = lots
        .into_iter()
        .filter_map(|(token_address, (token_symbol, token_lots))| {
            let amount: f64 = token_lots.iter().map(|l| l.amount).sum();
            if amount <= 0.0 {
                return None;
            }
            let cost: f64 = token_lots.iter().map(|l| l.amount * l.price).sum();
            let opened_at = token_lots
                .iter()
                .map(|l| l.opened_at)
                .min()
                .unwrap_or_else(Utc::now);
            Some(OpenHolding {
                token_address,
                token_symbol,
                amount,
                average_entry_price: cost / amount,
                opened_at,
            })
        })
        .collect();

    // newest first so truncation drops the oldest holdings
    holdings.sort_by(|a, b| b.opened_at.cmp(&a.opened_at));
    holdings
}

pub struct PortfolioService {
    market: Arc<dyn MarketDataRepository>,
    chain: Arc<dyn ChainRepository>,
    trades: Arc<dyn TradeRepository>,
    wallet_address: Option<String>,
    max_positions: usize,
}

impl PortfolioService {
    pub fn new(
        market: Arc<dyn MarketDataRepository>,
        chain: Arc<dyn ChainRepository>,
        trades: Arc<dyn TradeRepository>,
        wallet_address: Option<String>,
        max_positions: usize,
    ) -> Self {
        Self {
            market,
            chain,
            trades,
            wallet_address,
            max_positions,
        }
    }

    pub async fn open_positions(&self) -> AppResult<Vec<OpenHolding>> {
        let trades = self.trades.executed_trades(TRADE_HISTORY_WINDOW).await?;
        let mut holdings = open_holdings(&trades);
        holdings.truncate(self.max_positions);
        Ok(holdings)
    }

    /// Value the account: native balance plus every open position priced at
    /// the current market. Positions whose price cannot be fetched are
    /// excluded from the snapshot rather than valued stale.
    pub async fn get_portfolio(&self) -> AppResult<Portfolio> {
        let balance_sol = match &self.wallet_address {
            Some(address) => self.chain.get_balance(address).await?,
            None => 0.0,
        };

        let sol_price = self.market.get_price(SOL_MINT).await?.unwrap_or(0.0);
        let holdings = self.open_positions().await?;

        let price_futures = holdings
            .iter()
            .map(|h| self.market.get_price(&h.token_address));
        let prices = join_all(price_futures).await;

        let mut positions = Vec::new();
        for (holding, price) in holdings.into_iter().zip(prices) {
            let current_price = match price {
                Ok(Some(p)) => p,
                Ok(None) => {
                    log::warn!("No price for {}; excluding position", holding.token_symbol);
                    continue;
                }
                Err(e) => {
                    log::warn!(
                        "Price lookup failed for {}: {}; excluding position",
                        holding.token_symbol,
                        e
                    );
                    continue;
                }
            };

            let value_usd = holding.amount * current_price;
            let pnl_usd = (current_price - holding.average_entry_price) * holding.amount;
            let pnl_percentage = if holding.average_entry_price > 0.0 {
                (current_price - holding.average_entry_price) / holding.average_entry_price * 100.0
            } else {
                0.0
            };

            positions.push(Position {
                token_address: holding.token_address,
                token_symbol: holding.token_symbol,
                amount: holding.amount,
                average_entry_price: holding.average_entry_price,
                current_price,
                value_usd,
                pnl_usd,
                pnl_percentage,
                opened_at: holding.opened_at,
            });
        }

        let positions_value: f64 = positions.iter().map(|p| p.value_usd).sum();
        let total_value_usd = balance_sol * sol_price + positions_value;
        let unrealized_pnl_usd: f64 = positions.iter().map(|p| p.pnl_usd).sum();
        let unrealized_pnl_percentage = if total_value_usd > 0.0 {
            unrealized_pnl_usd / total_value_usd * 100.0
        } else {
            0.0
        };

        Ok(Portfolio {
            total_value_usd,
            available_balance_sol: balance_sol,
            positions,
            unrealized_pnl_usd,
            unrealized_pnl_percentage,
        })
    }

    /// Realized activity since midnight UTC.
    pub async fn daily_pnl(&self) -> AppResult<DailyPnl> {
        let midnight = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc();
        let trades = self.trades.executed_trades_since(midnight).await?;

        let mut pnl = DailyPnl::default();
        for trade in &trades {
            match trade.trade_type {
                TradeType::Buy => pnl.total_bought_usd += trade.value_usd,
                TradeType::Sell => pnl.total_sold_usd += trade.value_usd,
            }
        }
        pnl.pnl_usd = pnl.total_sold_usd - pnl.total_bought_usd;
        pnl.trade_count = trades.len();
        Ok(pnl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{ExecutionResult, MarketResult, StoreResult};
    use crate::domain::models::{MarketSnapshot, TradeStatus};
    use async_trait::async_trait;
    use chrono::Duration;

    fn executed(
        trade_type: TradeType,
        token: &str,
        amount: f64,
        price: f64,
        when: DateTime<Utc>,
    ) -> Trade {
        Trade {
            id: None,
            trade_type,
            token_address: format!("{}-mint", token),
            token_symbol: token.to_string(),
            amount,
            price,
            value_usd: amount * price,
            status: TradeStatus::Executed,
            signature: Some("sig".to_string()),
            signal_id: None,
            timestamp: when,
            executed_at: Some(when),
            error_message: None,
        }
    }

    struct MockMarket {
        prices: HashMap<String, f64>,
    }

    #[async_trait]
    impl MarketDataRepository for MockMarket {
        async fn get_price(&self, token_mint: &str) -> MarketResult<Option<f64>> {
            Ok(self.prices.get(token_mint).copied())
        }

        async fn get_comprehensive(
            &self,
            _token_address: &str,
            _token_symbol: &str,
        ) -> MarketResult<Option<MarketSnapshot>> {
            unreachable!("not used in these tests")
        }
    }

    struct MockChain {
        balance: f64,
    }

    #[async_trait]
    impl ChainRepository for MockChain {
        async fn get_balance(&self, _address: &str) -> ExecutionResult<f64> {
            Ok(self.balance)
        }

        async fn submit_transaction(&self, _signed_tx: &str) -> ExecutionResult<Option<String>> {
            unreachable!("not used in these tests")
        }

        async fn latest_blockhash(&self) -> ExecutionResult<String> {
            unreachable!("not used in these tests")
        }
    }

    struct MockTrades {
        trades: Vec<Trade>,
    }

    #[async_trait]
    impl TradeRepository for MockTrades {
        async fn insert_trade(&self, _trade: &Trade) -> StoreResult<i64> {
            Ok(1)
        }

        async fn recent_trades(
            &self,
            _token_address: Option<&str>,
            _limit: usize,
        ) -> StoreResult<Vec<Trade>> {
            Ok(self.trades.clone())
        }

        async fn executed_trades(&self, limit: usize) -> StoreResult<Vec<Trade>> {
            let mut trades = self.trades.clone();
            if trades.len() > limit {
                trades = trades.split_off(trades.len() - limit);
            }
            Ok(trades)
        }

        async fn executed_trades_since(&self, since: DateTime<Utc>) -> StoreResult<Vec<Trade>> {
            Ok(self
                .trades
                .iter()
                .filter(|t| t.timestamp >= since)
                .cloned()
                .collect())
        }
    }

    fn service(
        prices: HashMap<String, f64>,
        balance: f64,
        trades: Vec<Trade>,
    ) -> PortfolioService {
        PortfolioService::new(
            Arc::new(MockMarket { prices }),
            Arc::new(MockChain { balance }),
            Arc::new(MockTrades { trades }),
            Some("wallet".to_string()),
            10,
        )
    }

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn fifo_matches_oldest_lots_first() {
        let now = Utc::now();
        let trades = vec![
            executed(TradeType::Buy, "TOK", 100.0, 1.0, now - Duration::hours(3)),
            executed(TradeType::Buy, "TOK", 50.0, 2.0, now - Duration::hours(2)),
            executed(TradeType::Sell, "TOK", 120.0, 2.5, now - Duration::hours(1)),
        ];

        let holdings = open_holdings(&trades);
        assert_eq!(holdings.len(), 1);
        approx(holdings[0].amount, 30.0);
        approx(holdings[0].average_entry_price, 2.0);
    }

    #[test]
    fn oversell_drains_to_zero() {
        let now = Utc::now();
        let trades = vec![
            executed(TradeType::Buy, "TOK", 10.0, 1.0, now - Duration::hours(2)),
            executed(TradeType::Sell, "TOK", 25.0, 1.5, now - Duration::hours(1)),
        ];
        assert!(open_holdings(&trades).is_empty());
    }

    #[tokio::test]
    async fn portfolio_values_balance_and_positions() {
        let now = Utc::now();
        let mut prices = HashMap::new();
        prices.insert(SOL_MINT.to_string(), 150.0);
        prices.insert("TOK-mint".to_string(), 1.2);

        let trades = vec![executed(
            TradeType::Buy,
            "TOK",
            100.0,
            1.0,
            now - Duration::hours(1),
        )];
        let portfolio = service(prices, 2.0, trades).get_portfolio().await.unwrap();

        // 2 SOL * $150 + 100 tokens * $1.20
        approx(portfolio.total_value_usd, 420.0);
        approx(portfolio.available_balance_sol, 2.0);
        assert_eq!(portfolio.positions.len(), 1);
        approx(portfolio.positions[0].pnl_usd, 20.0);
        approx(portfolio.positions[0].pnl_percentage, 20.0);
        approx(portfolio.unrealized_pnl_usd, 20.0);
        approx(portfolio.unrealized_pnl_percentage, 20.0 / 420.0 * 100.0);
    }

    #[tokio::test]
    async fn position_without_price_is_excluded() {
        let now = Utc::now();
        let mut prices = HashMap::new();
        prices.insert(SOL_MINT.to_string(), 150.0);
        // no price for TOK-mint

        let trades = vec![executed(
            TradeType::Buy,
            "TOK",
            100.0,
            1.0,
            now - Duration::hours(1),
        )];
        let portfolio = service(prices, 2.0, trades).get_portfolio().await.unwrap();

        assert!(portfolio.positions.is_empty());
        approx(portfolio.total_value_usd, 300.0);
        approx(portfolio.unrealized_pnl_usd, 0.0);
    }

    #[tokio::test]
    async fn daily_pnl_nets_sells_against_buys() {
        let now = Utc::now();
        let old = now - Duration::days(3);
        let trades = vec![
            executed(TradeType::Buy, "OLD", 10.0, 1.0, old),
            executed(TradeType::Buy, "TOK", 100.0, 1.0, now),
            executed(TradeType::Sell, "TOK", 50.0, 1.4, now),
        ];
        let pnl = service(HashMap::new(), 0.0, trades).daily_pnl().await.unwrap();

        approx(pnl.total_bought_usd, 100.0);
        approx(pnl.total_sold_usd, 70.0);
        approx(pnl.pnl_usd, -30.0);
        assert_eq!(pnl.trade_count, 2);
    }
}
