use crate::Error;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Cryptocurrencies the wallet can exchange between
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub enum CryptoCurrency {
    Bitcoin,
    BitcoinCash,
    Dash,
    Ethereum,
    Litecoin,
    Monero,
    Eos,
    Ripple,
    Tron,
    BinanceCoin,
    Cardano,
    Stellar,
    Tether,
}

impl CryptoCurrency {
    pub const ALL: [CryptoCurrency; 13] = [
        CryptoCurrency::Bitcoin,
        CryptoCurrency::BitcoinCash,
        CryptoCurrency::Dash,
        CryptoCurrency::Ethereum,
        CryptoCurrency::Litecoin,
        CryptoCurrency::Monero,
        CryptoCurrency::Eos,
        CryptoCurrency::Ripple,
        CryptoCurrency::Tron,
        CryptoCurrency::BinanceCoin,
        CryptoCurrency::Cardano,
        CryptoCurrency::Stellar,
        CryptoCurrency::Tether,
    ];

    /// Canonical lowercase ticker used in exchange API calls
    pub fn ticker(&self) -> &'static str {
        match self {
            CryptoCurrency::Bitcoin => "btc",
            CryptoCurrency::BitcoinCash => "bch",
            CryptoCurrency::Dash => "dash",
            CryptoCurrency::Ethereum => "eth",
            CryptoCurrency::Litecoin => "ltc",
            CryptoCurrency::Monero => "xmr",
            CryptoCurrency::Eos => "eos",
            CryptoCurrency::Ripple => "xrp",
            CryptoCurrency::Tron => "trx",
            CryptoCurrency::BinanceCoin => "bnb",
            CryptoCurrency::Cardano => "ada",
            CryptoCurrency::Stellar => "xlm",
            CryptoCurrency::Tether => "usdt",
        }
    }

    /// Uppercase ticker for display (e.g., "XMR")
    pub fn formatted(&self) -> String {
        self.ticker().to_uppercase()
    }

    /// Number of fractional digits the currency's smallest unit allows
    pub fn decimals(&self) -> u32 {
        match self {
            CryptoCurrency::Bitcoin
            | CryptoCurrency::BitcoinCash
            | CryptoCurrency::Dash
            | CryptoCurrency::Litecoin
            | CryptoCurrency::BinanceCoin => 8,
            CryptoCurrency::Ethereum => 18,
            CryptoCurrency::Monero => 12,
            CryptoCurrency::Eos => 4,
            CryptoCurrency::Ripple
            | CryptoCurrency::Tron
            | CryptoCurrency::Cardano
            | CryptoCurrency::Tether => 6,
            CryptoCurrency::Stellar => 7,
        }
    }
}

impl std::fmt::Display for CryptoCurrency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.formatted())
    }
}

impl FromStr for CryptoCurrency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ticker = s.trim().to_lowercase();
        CryptoCurrency::ALL
            .iter()
            .copied()
            .find(|currency| currency.ticker() == ticker)
            .ok_or_else(|| Error::ParseError(format!("Unknown currency: {}", s)))
    }
}

impl TryFrom<String> for CryptoCurrency {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CryptoCurrency> for String {
    fn from(currency: CryptoCurrency) -> Self {
        currency.ticker().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ticker_any_case() {
        assert_eq!("XMR".parse::<CryptoCurrency>().unwrap(), CryptoCurrency::Monero);
        assert_eq!(" btc ".parse::<CryptoCurrency>().unwrap(), CryptoCurrency::Bitcoin);
        assert!("doge".parse::<CryptoCurrency>().is_err());
    }

    #[test]
    fn test_tickers_are_unique() {
        let mut tickers: Vec<_> = CryptoCurrency::ALL.iter().map(|c| c.ticker()).collect();
        tickers.sort();
        tickers.dedup();
        assert_eq!(tickers.len(), CryptoCurrency::ALL.len());
    }

    #[test]
    fn test_serde_uses_lowercase_ticker() {
        let json = serde_json::to_string(&CryptoCurrency::Tether).unwrap();
        assert_eq!(json, "\"usdt\"");
        let parsed: CryptoCurrency = serde_json::from_str("\"LTC\"").unwrap();
        assert_eq!(parsed, CryptoCurrency::Litecoin);
    }
}
