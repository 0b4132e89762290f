mod config;
mod error;
mod trade_store;

pub use config::StoreConfig;
pub use error::StoreError;
pub use trade_store::{open_store, JsonFileTradeStore, MemoryTradeStore, TradeStore, TradeSummary};
