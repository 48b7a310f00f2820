// src/application/signal_service.rs
// Signal generation: market snapshot, indicators, LLM analysis, persist,
// notify. A failure at any step before persistence leaves no trace.

use chrono::Utc;
use std::sync::Arc;

use crate::analysis::analyze_price_history;
use crate::domain::errors::{AppResult, MarketError};
use crate::domain::models::{PriceSample, TradingSignal};
use crate::domain::repository::{LlmAnalyzer, MarketDataRepository, Notifier, SignalRepository};
use crate::infrastructure::llm::prompts::trading_analysis_prompt;

pub struct SignalService {
    market: Arc<dyn MarketDataRepository>,
    llm: Arc<dyn LlmAnalyzer>,
    signals: Arc<dyn SignalRepository>,
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl SignalService {
    pub fn new(
        market: Arc<dyn MarketDataRepository>,
        llm: Arc<dyn LlmAnalyzer>,
        signals: Arc<dyn SignalRepository>,
        notifiers: Vec<Arc<dyn Notifier>>,
    ) -> Self {
        Self {
            market,
            llm,
            signals,
            notifiers,
        }
    }

    /// Generate, persist and announce a trading signal for one token.
    pub async fn generate_signal(
        &self,
        token_address: &str,
        token_symbol: &str,
        price_history: &[PriceSample],
        context: Option<&serde_json::Value>,
    ) -> AppResult<TradingSignal> {
        let snapshot = self
            .market
            .get_comprehensive(token_address, token_symbol)
            .await?
            .ok_or_else(|| MarketError::NoData(token_symbol.to_string()))?;

        let indicators = analyze_price_history(price_history);
        if indicators.is_empty() {
            log::debug!(
                "No usable indicators for {} ({} samples)",
                token_symbol,
                price_history.len()
            );
        }

        let prompt = trading_analysis_prompt(&snapshot, &indicators, context);
        let analysis = self.llm.analyze_signal(&prompt).await?;

        log::info!(
            "Signal for {}: {} ({}, confidence {:.2})",
            token_symbol,
            analysis.action,
            analysis.strength,
            analysis.confidence
        );

        let mut signal = TradingSignal {
            id: None,
            token_address: token_address.to_string(),
            token_symbol: token_symbol.to_string(),
            action: analysis.action,
            strength: analysis.strength,
            confidence: analysis.confidence,
            risk_level: analysis.risk_level,
            reasoning: analysis.reasoning,
            entry_price: analysis.entry_price.or(Some(snapshot.price)),
            stop_loss: analysis.stop_loss,
            take_profit: analysis.take_profit,
            timestamp: Utc::now(),
        };

        let id = self.signals.insert_signal(&signal).await?;
        signal.id = Some(id);

        for notifier in &self.notifiers {
            if !notifier.is_configured() {
                continue;
            }
            if let Err(e) = notifier.notify_signal(&signal).await {
                log::warn!("Signal notification failed: {}", e);
            }
        }

        Ok(signal)
    }

    pub async fn recent_signals(
        &self,
        token_address: Option<&str>,
        limit: usize,
    ) -> AppResult<Vec<TradingSignal>> {
        Ok(self.signals.recent_signals(token_address, limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{
        LlmError, LlmResult, MarketResult, NotifyResult, StoreResult,
    };
    use crate::domain::models::{
        LlmResponse, MarketSnapshot, RiskLevel, SignalStrength, Trade, TradeAction,
        TradeAnalysis,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct MockMarket {
        snapshot: Option<MarketSnapshot>,
    }

    #[async_trait]
    impl MarketDataRepository for MockMarket {
        async fn get_price(&self, _token_mint: &str) -> MarketResult<Option<f64>> {
            Ok(self.snapshot.as_ref().map(|s| s.price))
        }

        async fn get_comprehensive(
            &self,
            _token_address: &str,
            _token_symbol: &str,
        ) -> MarketResult<Option<MarketSnapshot>> {
            Ok(self.snapshot.clone())
        }
    }

    struct MockLlm {
        result: fn() -> LlmResult<TradeAnalysis>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl LlmAnalyzer for MockLlm {
        async fn generate(&self, _prompt: &str, _max_tokens: u32) -> LlmResult<LlmResponse> {
            unreachable!("not used in these tests")
        }

        async fn generate_json(
            &self,
            _prompt: &str,
            _max_tokens: u32,
        ) -> LlmResult<serde_json::Value> {
            unreachable!("not used in these tests")
        }

        async fn analyze_signal(&self, _prompt: &str) -> LlmResult<TradeAnalysis> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    #[derive(Default)]
    struct MockSignalRepo {
        inserted: Mutex<Vec<TradingSignal>>,
    }

    #[async_trait]
    impl SignalRepository for MockSignalRepo {
        async fn insert_signal(&self, signal: &TradingSignal) -> StoreResult<i64> {
            let mut inserted = self.inserted.lock().unwrap();
            inserted.push(signal.clone());
            Ok(inserted.len() as i64)
        }

        async fn recent_signals(
            &self,
            _token_address: Option<&str>,
            _limit: usize,
        ) -> StoreResult<Vec<TradingSignal>> {
            Ok(self.inserted.lock().unwrap().clone())
        }
    }

    #[derive(Default)]
    struct MockNotifier {
        signal_count: AtomicU32,
    }

    #[async_trait]
    impl Notifier for MockNotifier {
        fn is_configured(&self) -> bool {
            true
        }

        async fn notify_signal(&self, _signal: &TradingSignal) -> NotifyResult<()> {
            self.signal_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn notify_trade(&self, _trade: &Trade) -> NotifyResult<()> {
            Ok(())
        }
    }

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            token_address: "mint".to_string(),
            token_symbol: "TEST".to_string(),
            price: 1.5,
            volume_24h: 100_000.0,
            price_change_24h: 2.0,
            market_cap: None,
            liquidity_usd: Some(50_000.0),
            timestamp: Utc::now(),
        }
    }

    fn good_analysis() -> LlmResult<TradeAnalysis> {
        Ok(TradeAnalysis {
            action: TradeAction::Buy,
            strength: SignalStrength::Strong,
            confidence: 0.8,
            risk_level: RiskLevel::Medium,
            reasoning: "momentum".to_string(),
            entry_price: None,
            stop_loss: Some(1.3),
            take_profit: Some(1.9),
            position_size_percent: None,
        })
    }

    fn service(
        snapshot: Option<MarketSnapshot>,
        llm_result: fn() -> LlmResult<TradeAnalysis>,
    ) -> (
        SignalService,
        Arc<MockSignalRepo>,
        Arc<MockNotifier>,
        Arc<MockLlm>,
    ) {
        let repo = Arc::new(MockSignalRepo::default());
        let notifier = Arc::new(MockNotifier::default());
        let llm = Arc::new(MockLlm {
            result: llm_result,
            calls: AtomicU32::new(0),
        });
        let service = SignalService::new(
            Arc::new(MockMarket { snapshot }),
            llm.clone(),
            repo.clone(),
            vec![notifier.clone()],
        );
        (service, repo, notifier, llm)
    }

    #[tokio::test]
    async fn signal_is_persisted_and_announced() {
        let (service, repo, notifier, _) = service(Some(snapshot()), good_analysis);

        let signal = service
            .generate_signal("mint", "TEST", &[], None)
            .await
            .unwrap();

        assert_eq!(signal.id, Some(1));
        assert_eq!(signal.action, TradeAction::Buy);
        // entry price falls back to the snapshot price
        assert_eq!(signal.entry_price, Some(1.5));
        assert_eq!(repo.inserted.lock().unwrap().len(), 1);
        assert_eq!(notifier.signal_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_analysis_leaves_no_trace() {
        let (service, repo, notifier, _) = service(Some(snapshot()), || {
            Err(LlmError::SchemaViolation("bad action".to_string()))
        });

        let result = service.generate_signal("mint", "TEST", &[], None).await;

        assert!(result.is_err());
        assert!(repo.inserted.lock().unwrap().is_empty());
        assert_eq!(notifier.signal_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_market_data_skips_the_llm() {
        let (service, _, _, llm) = service(None, good_analysis);

        let result = service.generate_signal("mint", "TEST", &[], None).await;

        assert!(result.is_err());
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }
}
