// src/application/risk.rs
// Pre-trade risk gates. All checks are pure; callers decide what to do
// with a rejection reason.

use crate::config::{Environment, TradingConfig};
use crate::domain::models::{RiskLevel, SignalStrength, TradeAction, TradingSignal};

const MIN_CONFIDENCE: f64 = 0.6;

pub struct RiskValidator {
    trading: TradingConfig,
    environment: Environment,
}

impl RiskValidator {
    pub fn new(trading: TradingConfig, environment: Environment) -> Self {
        Self {
            trading,
            environment,
        }
    }

    /// Decide whether a signal qualifies for execution. Gates are evaluated
    /// in a fixed order and the first failure wins.
    pub fn should_execute(&self, signal: &TradingSignal) -> Result<(), String> {
        if signal.confidence < MIN_CONFIDENCE {
            return Err(format!(
                "confidence {:.2} below minimum {:.2}",
                signal.confidence, MIN_CONFIDENCE
            ));
        }

        if signal.action == TradeAction::Hold {
            return Err("signal action is hold".to_string());
        }

        if signal.risk_level == RiskLevel::High && self.environment.is_production() {
            return Err("high risk signals are not executed in production".to_string());
        }

        if matches!(
            signal.strength,
            SignalStrength::VeryWeak | SignalStrength::Weak
        ) {
            return Err(format!("signal strength {} too weak", signal.strength));
        }

        Ok(())
    }

    /// Validate a proposed trade size against wallet balance. Boundary
    /// values are allowed: a trade exactly at a limit passes.
    pub fn validate_trade(&self, amount_sol: f64, balance_sol: f64) -> Result<(), String> {
        if amount_sol < self.trading.min_trade_amount_sol {
            return Err(format!(
                "trade amount {} below minimum {}",
                amount_sol, self.trading.min_trade_amount_sol
            ));
        }

        if balance_sol - amount_sol < self.trading.reserve_balance_sol {
            return Err(format!(
                "trade would leave balance below reserve of {} SOL",
                self.trading.reserve_balance_sol
            ));
        }

        let max_amount = balance_sol * self.trading.max_position_size;
        if amount_sol > max_amount {
            return Err(format!(
                "trade amount {} exceeds maximum position size {:.6} SOL",
                amount_sol, max_amount
            ));
        }

        Ok(())
    }
}
