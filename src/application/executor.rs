// src/application/executor.rs
// Swap execution pipeline: quote, build, sign, submit. Submission happens
// at most once per trade; a rejected submission becomes a failed trade
// record, never a retry.

use chrono::Utc;
use std::sync::Arc;

use crate::config::Environment;
use crate::domain::errors::{ExecutionError, ExecutionResult};
use crate::domain::models::{
    lamports_to_sol, sol_to_lamports, SwapPreview, Trade, TradeStatus, TradeType,
    PAPER_TRADE_SIGNATURE, SOL_MINT,
};
use crate::domain::repository::{ChainRepository, SwapRouteRepository, WalletSigner};

const BPS_DENOMINATOR: u64 = 10_000;

/// Worst acceptable output for a quote under the configured slippage.
pub fn minimum_amount_out(out_amount: u64, slippage_bps: u16) -> u64 {
    ((out_amount as u128 * (BPS_DENOMINATOR - slippage_bps as u64) as u128)
        / BPS_DENOMINATOR as u128) as u64
}

pub struct TradeExecutor {
    routing: Arc<dyn SwapRouteRepository>,
    chain: Arc<dyn ChainRepository>,
    wallet: Option<Arc<dyn WalletSigner>>,
    environment: Environment,
    slippage_bps: u16,
}

impl TradeExecutor {
    pub fn new(
        routing: Arc<dyn SwapRouteRepository>,
        chain: Arc<dyn ChainRepository>,
        wallet: Option<Arc<dyn WalletSigner>>,
        environment: Environment,
        trade_slippage: f64,
    ) -> Self {
        Self {
            routing,
            chain,
            wallet,
            environment,
            slippage_bps: (trade_slippage * BPS_DENOMINATOR as f64) as u16,
        }
    }

    pub async fn execute_buy(
        &self,
        token_mint: &str,
        token_symbol: &str,
        amount_sol: f64,
        signal_id: Option<i64>,
    ) -> ExecutionResult<Trade> {
        self.execute_swap(
            SOL_MINT,
            token_mint,
            token_mint,
            token_symbol,
            amount_sol,
            TradeType::Buy,
            signal_id,
        )
        .await
    }

    pub async fn execute_sell(
        &self,
        token_mint: &str,
        token_symbol: &str,
        amount: f64,
        signal_id: Option<i64>,
    ) -> ExecutionResult<Trade> {
        self.execute_swap(
            token_mint,
            SOL_MINT,
            token_mint,
            token_symbol,
            amount,
            TradeType::Sell,
            signal_id,
        )
        .await
    }

    /// Quote a swap without committing to it.
    pub async fn simulate_swap(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: f64,
    ) -> ExecutionResult<Option<SwapPreview>> {
        let quote = self
            .routing
            .quote(input_mint, output_mint, sol_to_lamports(amount), self.slippage_bps)
            .await?;

        Ok(quote.map(|q| SwapPreview {
            input_amount: lamports_to_sol(q.in_amount),
            output_amount: lamports_to_sol(q.out_amount),
            price_impact_pct: q.price_impact_pct,
            route_count: q.route_hops,
        }))
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_swap(
        &self,
        input_mint: &str,
        output_mint: &str,
        token_address: &str,
        token_symbol: &str,
        amount: f64,
        trade_type: TradeType,
        signal_id: Option<i64>,
    ) -> ExecutionResult<Trade> {
        let now = Utc::now();

        if self.environment.is_paper_trading() {
            log::info!(
                "Paper trade: {} {} {}",
                trade_type,
                amount,
                token_symbol
            );
            return Ok(Trade {
                id: None,
                trade_type,
                token_address: token_address.to_string(),
                token_symbol: token_symbol.to_string(),
                amount,
                price: 0.0,
                value_usd: 0.0,
                status: TradeStatus::Executed,
                signature: Some(PAPER_TRADE_SIGNATURE.to_string()),
                signal_id,
                timestamp: now,
                executed_at: Some(now),
                error_message: None,
            });
        }

        let wallet = self
            .wallet
            .as_ref()
            .ok_or(ExecutionError::WalletNotConfigured)?;

        let amount_lamports = sol_to_lamports(amount);
        let quote = self
            .routing
            .quote(input_mint, output_mint, amount_lamports, self.slippage_bps)
            .await?
            .ok_or(ExecutionError::NoRoute)?;

        let price = if quote.in_amount > 0 {
            quote.out_amount as f64 / quote.in_amount as f64
        } else {
            0.0
        };
        let min_out = minimum_amount_out(quote.out_amount, self.slippage_bps);
        log::info!(
            "Quote {} -> {}: out {} (min {}), impact {:.4}%, {} hops",
            input_mint,
            output_mint,
            quote.out_amount,
            min_out,
            quote.price_impact_pct,
            quote.route_hops
        );

        let transaction = self
            .routing
            .build_swap(&quote, wallet.address())
            .await?
            .ok_or_else(|| ExecutionError::Build("no swap transaction returned".to_string()))?;

        let signed = wallet.sign_transaction(&transaction.swap_transaction)?;

        // Input amount measured in SOL units; USD conversion happens at
        // portfolio valuation time.
        let value = lamports_to_sol(quote.in_amount);

        // Single submission attempt. A failure here may still have landed
        // on chain, so the outcome is recorded rather than retried.
        let trade = match self.chain.submit_transaction(&signed).await {
            Ok(Some(signature)) => {
                log::info!("Trade submitted: {}", signature);
                Trade {
                    id: None,
                    trade_type,
                    token_address: token_address.to_string(),
                    token_symbol: token_symbol.to_string(),
                    amount,
                    price,
                    value_usd: value,
                    status: TradeStatus::Executed,
                    signature: Some(signature),
                    signal_id,
                    timestamp: now,
                    executed_at: Some(Utc::now()),
                    error_message: None,
                }
            }
            Ok(None) => failed_trade(
                trade_type,
                token_address,
                token_symbol,
                amount,
                price,
                value,
                signal_id,
                "transaction was not accepted".to_string(),
            ),
            Err(e) => {
                log::error!("Transaction submission failed: {}", e);
                failed_trade(
                    trade_type,
                    token_address,
                    token_symbol,
                    amount,
                    price,
                    value,
                    signal_id,
                    e.to_string(),
                )
            }
        };

        Ok(trade)
    }
}

#[allow(clippy::too_many_arguments)]
fn failed_trade(
    trade_type: TradeType,
    token_address: &str,
    token_symbol: &str,
    amount: f64,
    price: f64,
    value_usd: f64,
    signal_id: Option<i64>,
    error: String,
) -> Trade {
    Trade {
        id: None,
        trade_type,
        token_address: token_address.to_string(),
        token_symbol: token_symbol.to_string(),
        amount,
        price,
        value_usd,
        status: TradeStatus::Failed,
        signature: None,
        signal_id,
        timestamp: Utc::now(),
        executed_at: None,
        error_message: Some(error),
    }
}
