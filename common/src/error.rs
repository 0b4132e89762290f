use crate::models::CryptoCurrency;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Parsing error: {0}")]
    ParseError(String),

    #[error("Trade was refused by the exchange (check the amount against the exchange limits)")]
    TradeCreationRefused,

    #[error("Trade creation failed: {0}")]
    TradeCreationFailed(String),

    #[error("Exchange API error: {0}")]
    ExchangeError(String),

    #[error("Unsupported pair: {from} -> {to}")]
    UnsupportedPair {
        from: CryptoCurrency,
        to: CryptoCurrency,
    },

    #[error("Currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch {
        expected: CryptoCurrency,
        found: CryptoCurrency,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DbError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Request was cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    InternalError(String),
}
