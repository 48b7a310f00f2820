// src/infrastructure/persistence/mod.rs
// SQLite-backed signal and trade stores. Both tables are append-only;
// status corrections happen by inserting the trade already terminal.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;

use crate::domain::errors::{StoreError, StoreResult};
use crate::domain::models::{Trade, TradingSignal};
use crate::domain::repository::{SignalRepository, TradeRepository};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS signals (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                token_address TEXT NOT NULL,
                token_symbol  TEXT NOT NULL,
                action        TEXT NOT NULL,
                strength      TEXT NOT NULL,
                confidence    REAL NOT NULL,
                risk_level    TEXT NOT NULL,
                reasoning     TEXT NOT NULL,
                entry_price   REAL,
                stop_loss     REAL,
                take_profit   REAL,
                timestamp     TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_signals_token ON signals(token_address);

            CREATE TABLE IF NOT EXISTS trades (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                trade_type    TEXT NOT NULL,
                token_address TEXT NOT NULL,
                token_symbol  TEXT NOT NULL,
                amount        REAL NOT NULL,
                price         REAL NOT NULL,
                value_usd     REAL NOT NULL,
                status        TEXT NOT NULL,
                signature     TEXT,
                signal_id     INTEGER,
                timestamp     TEXT NOT NULL,
                executed_at   TEXT,
                error_message TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_trades_token ON trades(token_address);
            CREATE INDEX IF NOT EXISTS idx_trades_status ON trades(status);",
        )?;
        Ok(())
    }
}

/// Enum columns are stored as their serde string form; parse back through
/// serde so the two representations cannot drift.
fn parse_enum<T: serde::de::DeserializeOwned>(index: usize, s: &str) -> rusqlite::Result<T> {
    serde_json::from_value(serde_json::Value::String(s.to_string())).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            rusqlite::types::Type::Text,
            Box::new(StoreError::InvalidRecord(format!("bad enum value: {}", s))),
        )
    })
}

fn parse_timestamp(index: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                index,
                rusqlite::types::Type::Text,
                Box::new(StoreError::InvalidRecord(format!("bad timestamp: {}", s))),
            )
        })
}

fn signal_from_row(row: &Row) -> rusqlite::Result<TradingSignal> {
    Ok(TradingSignal {
        id: Some(row.get(0)?),
        token_address: row.get(1)?,
        token_symbol: row.get(2)?,
        action: parse_enum(3, &row.get::<_, String>(3)?)?,
        strength: parse_enum(4, &row.get::<_, String>(4)?)?,
        confidence: row.get(5)?,
        risk_level: parse_enum(6, &row.get::<_, String>(6)?)?,
        reasoning: row.get(7)?,
        entry_price: row.get(8)?,
        stop_loss: row.get(9)?,
        take_profit: row.get(10)?,
        timestamp: parse_timestamp(11, &row.get::<_, String>(11)?)?,
    })
}

fn trade_from_row(row: &Row) -> rusqlite::Result<Trade> {
    let executed_at = match row.get::<_, Option<String>>(11)? {
        Some(s) => Some(parse_timestamp(11, &s)?),
        None => None,
    };
    Ok(Trade {
        id: Some(row.get(0)?),
        trade_type: parse_enum(1, &row.get::<_, String>(1)?)?,
        token_address: row.get(2)?,
        token_symbol: row.get(3)?,
        amount: row.get(4)?,
        price: row.get(5)?,
        value_usd: row.get(6)?,
        status: parse_enum(7, &row.get::<_, String>(7)?)?,
        signature: row.get(8)?,
        signal_id: row.get(9)?,
        timestamp: parse_timestamp(10, &row.get::<_, String>(10)?)?,
        executed_at,
        error_message: row.get(12)?,
    })
}

const SIGNAL_COLUMNS: &str = "id, token_address, token_symbol, action, strength, confidence, \
     risk_level, reasoning, entry_price, stop_loss, take_profit, timestamp";

const TRADE_COLUMNS: &str = "id, trade_type, token_address, token_symbol, amount, price, \
     value_usd, status, signature, signal_id, timestamp, executed_at, error_message";

#[async_trait]
impl SignalRepository for SqliteStore {
    async fn insert_signal(&self, signal: &TradingSignal) -> StoreResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO signals (token_address, token_symbol, action, strength, confidence,
                risk_level, reasoning, entry_price, stop_loss, take_profit, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                signal.token_address,
                signal.token_symbol,
                signal.action.as_str(),
                signal.strength.as_str(),
                signal.confidence,
                signal.risk_level.as_str(),
                signal.reasoning,
                signal.entry_price,
                signal.stop_loss,
                signal.take_profit,
                signal.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn recent_signals(
        &self,
        token_address: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<TradingSignal>> {
        let conn = self.conn.lock().unwrap();
        let sql = match token_address {
            Some(_) => format!(
                "SELECT {} FROM signals WHERE token_address = ?1 ORDER BY id DESC LIMIT ?2",
                SIGNAL_COLUMNS
            ),
            None => format!(
                "SELECT {} FROM signals ORDER BY id DESC LIMIT ?1",
                SIGNAL_COLUMNS
            ),
        };
        let mut stmt = conn.prepare(&sql)?;

        let rows = match token_address {
            Some(token) => stmt.query_map(params![token, limit as i64], signal_from_row)?,
            None => stmt.query_map(params![limit as i64], signal_from_row)?,
        };

        let mut signals = Vec::new();
        for row in rows {
            signals.push(row?);
        }
        Ok(signals)
    }
}

#[async_trait]
impl TradeRepository for SqliteStore {
    async fn insert_trade(&self, trade: &Trade) -> StoreResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO trades (trade_type, token_address, token_symbol, amount, price,
                value_usd, status, signature, signal_id, timestamp, executed_at, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                trade.trade_type.as_str(),
                trade.token_address,
                trade.token_symbol,
                trade.amount,
                trade.price,
                trade.value_usd,
                trade.status.as_str(),
                trade.signature,
                trade.signal_id,
                trade.timestamp.to_rfc3339(),
                trade.executed_at.map(|t| t.to_rfc3339()),
                trade.error_message,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn recent_trades(
        &self,
        token_address: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<Trade>> {
        let conn = self.conn.lock().unwrap();
        let sql = match token_address {
            Some(_) => format!(
                "SELECT {} FROM trades WHERE token_address = ?1 ORDER BY id DESC LIMIT ?2",
                TRADE_COLUMNS
            ),
            None => format!(
                "SELECT {} FROM trades ORDER BY id DESC LIMIT ?1",
                TRADE_COLUMNS
            ),
        };
        let mut stmt = conn.prepare(&sql)?;

        let rows = match token_address {
            Some(token) => stmt.query_map(params![token, limit as i64], trade_from_row)?,
            None => stmt.query_map(params![limit as i64], trade_from_row)?,
        };

        let mut trades = Vec::new();
        for row in rows {
            trades.push(row?);
        }
        Ok(trades)
    }

    async fn executed_trades(&self, limit: usize) -> StoreResult<Vec<Trade>> {
        let conn = self.conn.lock().unwrap();
        // Bounded to the most recent rows, then flipped back to
        // chronological order for lot matching.
        let sql = format!(
            "SELECT {} FROM (
                SELECT {} FROM trades WHERE status = 'executed' ORDER BY id DESC LIMIT ?1
             ) ORDER BY id ASC",
            TRADE_COLUMNS, TRADE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit as i64], trade_from_row)?;

        let mut trades = Vec::new();
        for row in rows {
            trades.push(row?);
        }
        Ok(trades)
    }

    async fn executed_trades_since(&self, since: DateTime<Utc>) -> StoreResult<Vec<Trade>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM trades WHERE status = 'executed' AND timestamp >= ?1 ORDER BY id ASC",
            TRADE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![since.to_rfc3339()], trade_from_row)?;

        let mut trades = Vec::new();
        for row in rows {
            trades.push(row?);
        }
        Ok(trades)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{
        RiskLevel, SignalStrength, TradeAction, TradeStatus, TradeType,
    };
    use chrono::Duration;

    fn sample_signal(symbol: &str) -> TradingSignal {
        TradingSignal {
            id: None,
            token_address: format!("{}-mint", symbol),
            token_symbol: symbol.to_string(),
            action: TradeAction::Buy,
            strength: SignalStrength::Strong,
            confidence: 0.8,
            risk_level: RiskLevel::Medium,
            reasoning: "test".to_string(),
            entry_price: Some(1.0),
            stop_loss: None,
            take_profit: None,
            timestamp: Utc::now(),
        }
    }

    fn sample_trade(symbol: &str, status: TradeStatus, when: DateTime<Utc>) -> Trade {
        Trade {
            id: None,
            trade_type: TradeType::Buy,
            token_address: format!("{}-mint", symbol),
            token_symbol: symbol.to_string(),
            amount: 1.5,
            price: 2.0,
            value_usd: 3.0,
            status,
            signature: Some("sig".to_string()),
            signal_id: None,
            timestamp: when,
            executed_at: Some(when),
            error_message: None,
        }
    }

    #[tokio::test]
    async fn signal_round_trip_newest_first() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = store.insert_signal(&sample_signal("AAA")).await.unwrap();
        let second = store.insert_signal(&sample_signal("BBB")).await.unwrap();
        assert!(second > first);

        let signals = store.recent_signals(None, 10).await.unwrap();
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].token_symbol, "BBB");
        assert_eq!(signals[0].action, TradeAction::Buy);
        assert_eq!(signals[0].strength, SignalStrength::Strong);
        assert_eq!(signals[1].token_symbol, "AAA");
    }

    #[tokio::test]
    async fn signals_filter_by_token() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_signal(&sample_signal("AAA")).await.unwrap();
        store.insert_signal(&sample_signal("BBB")).await.unwrap();

        let signals = store.recent_signals(Some("AAA-mint"), 10).await.unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].token_symbol, "AAA");
    }

    #[tokio::test]
    async fn executed_trades_are_chronological_and_filtered() {
        let store = SqliteStore::open_in_memory().unwrap();
        let now = Utc::now();
        store
            .insert_trade(&sample_trade("AAA", TradeStatus::Executed, now))
            .await
            .unwrap();
        store
            .insert_trade(&sample_trade("BBB", TradeStatus::Failed, now))
            .await
            .unwrap();
        store
            .insert_trade(&sample_trade("CCC", TradeStatus::Executed, now))
            .await
            .unwrap();

        let executed = store.executed_trades(100).await.unwrap();
        assert_eq!(executed.len(), 2);
        assert_eq!(executed[0].token_symbol, "AAA");
        assert_eq!(executed[1].token_symbol, "CCC");

        let recent = store.recent_trades(None, 10).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].token_symbol, "CCC");
    }

    #[tokio::test]
    async fn executed_trades_since_cutoff() {
        let store = SqliteStore::open_in_memory().unwrap();
        let now = Utc::now();
        store
            .insert_trade(&sample_trade(
                "OLD",
                TradeStatus::Executed,
                now - Duration::days(2),
            ))
            .await
            .unwrap();
        store
            .insert_trade(&sample_trade("NEW", TradeStatus::Executed, now))
            .await
            .unwrap();

        let since = now - Duration::hours(1);
        let trades = store.executed_trades_since(since).await.unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].token_symbol, "NEW");
    }
}
