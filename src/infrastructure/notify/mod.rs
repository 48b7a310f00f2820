// src/infrastructure/notify/mod.rs
// Outbound notification channels. Delivery failures are reported to the
// caller, which logs and moves on; a dead channel never blocks trading.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use crate::config::NotificationConfig;
use crate::domain::errors::{NotifyError, NotifyResult};
use crate::domain::models::{Trade, TradeStatus, TradingSignal};
use crate::domain::repository::Notifier;
use crate::util::{format_sol, format_usd, truncate_address};

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

fn signal_message(signal: &TradingSignal) -> String {
    let mut lines = vec![
        format!(
            "Signal: {} {} ({})",
            signal.action.to_string().to_uppercase(),
            signal.token_symbol,
            truncate_address(&signal.token_address)
        ),
        format!(
            "Strength: {} | Confidence: {:.0}% | Risk: {}",
            signal.strength,
            signal.confidence * 100.0,
            signal.risk_level
        ),
    ];
    if let Some(entry) = signal.entry_price {
        lines.push(format!("Entry: {}", format_usd(entry)));
    }
    lines.push(signal.reasoning.clone());
    lines.join("\n")
}

fn trade_message(trade: &Trade) -> String {
    let status = match trade.status {
        TradeStatus::Executed => "Executed",
        TradeStatus::Failed => "FAILED",
        TradeStatus::Pending => "Pending",
        TradeStatus::Cancelled => "Cancelled",
    };
    let mut lines = vec![
        format!(
            "Trade {}: {} {}",
            status,
            trade.trade_type.to_string().to_uppercase(),
            trade.token_symbol
        ),
        format!(
            "Amount: {} | Value: {}",
            format_sol(trade.amount),
            format_usd(trade.value_usd)
        ),
    ];
    if let Some(sig) = &trade.signature {
        lines.push(format!("Tx: {}", truncate_address(sig)));
    }
    if let Some(err) = &trade.error_message {
        lines.push(format!("Error: {}", err));
    }
    lines.join("\n")
}

pub struct TelegramNotifier {
    client: Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(config: &NotificationConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            bot_token: config.telegram_bot_token.clone(),
            chat_id: config.telegram_chat_id.clone(),
        }
    }

    async fn send(&self, text: &str) -> NotifyResult<()> {
        if !self.is_configured() {
            return Err(NotifyError::NotConfigured);
        }
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let response = self
            .client
            .post(&url)
            .json(&json!({"chat_id": self.chat_id, "text": text}))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Delivery(format!(
                "Telegram returned HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn is_configured(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }

    async fn notify_signal(&self, signal: &TradingSignal) -> NotifyResult<()> {
        self.send(&signal_message(signal)).await
    }

    async fn notify_trade(&self, trade: &Trade) -> NotifyResult<()> {
        self.send(&trade_message(trade)).await
    }
}

pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
}

impl DiscordNotifier {
    pub fn new(config: &NotificationConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            webhook_url: config.discord_webhook_url.clone(),
        }
    }

    async fn send(&self, text: &str) -> NotifyResult<()> {
        if !self.is_configured() {
            return Err(NotifyError::NotConfigured);
        }
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&json!({"content": text}))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Delivery(format!(
                "Discord returned HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn is_configured(&self) -> bool {
        !self.webhook_url.is_empty()
    }

    async fn notify_signal(&self, signal: &TradingSignal) -> NotifyResult<()> {
        self.send(&signal_message(signal)).await
    }

    async fn notify_trade(&self, trade: &Trade) -> NotifyResult<()> {
        self.send(&trade_message(trade)).await
    }
}
