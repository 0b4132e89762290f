use crate::{StoreConfig, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::models::{ProviderId, Trade};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// What the trade history list shows for each saved trade
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TradeSummary {
    #[serde(rename = "tradeID")]
    pub trade_id: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub date: DateTime<Utc>,
    pub provider: ProviderId,
}

impl From<&Trade> for TradeSummary {
    fn from(trade: &Trade) -> Self {
        Self {
            trade_id: trade.id.clone(),
            date: trade.created_at,
            provider: trade.provider,
        }
    }
}

/// Persistence for trades, keyed by trade id
#[async_trait]
pub trait TradeStore: Send + Sync {
    /// Insert the trade, or replace the saved trade with the same id
    async fn save(&self, trade: &Trade) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<Trade>, StoreError>;

    /// Summaries of every saved trade, newest first
    async fn summaries(&self) -> Result<Vec<TradeSummary>, StoreError>;
}

fn upsert(trades: &mut Vec<Trade>, trade: &Trade) {
    match trades.iter_mut().find(|saved| saved.id == trade.id) {
        Some(saved) => *saved = trade.clone(),
        None => trades.push(trade.clone()),
    }
}

fn summarize(trades: &[Trade]) -> Vec<TradeSummary> {
    let mut summaries: Vec<TradeSummary> = trades.iter().map(TradeSummary::from).collect();
    summaries.sort_by(|a, b| b.date.cmp(&a.date));
    summaries
}

#[derive(Default)]
pub struct MemoryTradeStore {
    trades: RwLock<Vec<Trade>>,
}

impl MemoryTradeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TradeStore for MemoryTradeStore {
    async fn save(&self, trade: &Trade) -> Result<(), StoreError> {
        debug!("Saving trade {} in memory", trade.id);
        upsert(&mut *self.trades.write().await, trade);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Trade>, StoreError> {
        Ok(self.trades.read().await.iter().find(|t| t.id == id).cloned())
    }

    async fn summaries(&self) -> Result<Vec<TradeSummary>, StoreError> {
        Ok(summarize(&self.trades.read().await))
    }
}

/// Trades kept in a JSON array on disk, rewritten on every save
pub struct JsonFileTradeStore {
    path: PathBuf,
    trades: RwLock<Vec<Trade>>,
}

impl JsonFileTradeStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let trades = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Vec::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        info!("Loaded {} trades from {}", trades.len(), path.display());

        Ok(Self {
            path,
            trades: RwLock::new(trades),
        })
    }

    async fn persist(&self, trades: &[Trade]) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(trades)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl TradeStore for JsonFileTradeStore {
    async fn save(&self, trade: &Trade) -> Result<(), StoreError> {
        debug!("Saving trade {} to {}", trade.id, self.path.display());

        // Hold the write lock across the file write so saves stay ordered
        let mut trades = self.trades.write().await;
        let mut updated = trades.clone();
        upsert(&mut updated, trade);
        self.persist(&updated).await?;
        *trades = updated;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Trade>, StoreError> {
        Ok(self.trades.read().await.iter().find(|t| t.id == id).cloned())
    }

    async fn summaries(&self) -> Result<Vec<TradeSummary>, StoreError> {
        Ok(summarize(&self.trades.read().await))
    }
}

/// Build the store described by `config`
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn TradeStore>, StoreError> {
    match &config.trades_file {
        Some(path) => Ok(Arc::new(JsonFileTradeStore::open(path).await?)),
        None => Ok(Arc::new(MemoryTradeStore::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use common::models::{Amount, CryptoCurrency, TradeState};
    use rust_decimal_macros::dec;

    fn trade(id: &str, age_minutes: i64) -> Trade {
        Trade {
            id: id.to_string(),
            provider: ProviderId::ChangeNow,
            from: CryptoCurrency::Bitcoin,
            to: CryptoCurrency::Monero,
            input_address: "addr1".to_string(),
            amount: Amount::new(CryptoCurrency::Bitcoin, dec!(0.01)).unwrap(),
            payout_address: "addr2".to_string(),
            refund_address: Some("refund".to_string()),
            extra_id: None,
            state: TradeState::Created,
            output_transaction: None,
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    #[tokio::test]
    async fn test_memory_store_upserts_by_id() {
        let store = MemoryTradeStore::new();
        let mut first = trade("a", 10);
        store.save(&first).await.unwrap();
        store.save(&trade("b", 5)).await.unwrap();

        first.transition(TradeState::Exchanging).unwrap();
        store.save(&first).await.unwrap();

        let summaries = store.summaries().await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].trade_id, "b");
        assert_eq!(summaries[1].trade_id, "a");

        let saved = store.get("a").await.unwrap().unwrap();
        assert_eq!(saved.state, TradeState::Exchanging);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.json");

        {
            let store = JsonFileTradeStore::open(&path).await.unwrap();
            store.save(&trade("abc123", 1)).await.unwrap();
        }

        let reopened = JsonFileTradeStore::open(&path).await.unwrap();
        let saved = reopened.get("abc123").await.unwrap().unwrap();
        assert_eq!(saved.input_address, "addr1");
        assert_eq!(saved.amount, Amount::new(CryptoCurrency::Bitcoin, dec!(0.01)).unwrap());

        let summaries = reopened.summaries().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].provider, ProviderId::ChangeNow);
    }

    #[test]
    fn test_summary_json_shape() {
        let summary = TradeSummary::from(&trade("abc123", 0));
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["tradeID"], "abc123");
        assert_eq!(json["provider"], "changenow");
        assert!(json["date"].is_i64());
    }
}
