use crate::models::CryptoCurrency;
use serde::{Deserialize, Serialize};

/// An ordered conversion a provider supports
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Pair {
    pub from: CryptoCurrency,
    pub to: CryptoCurrency,
    /// Whether the provider can also quote the opposite direction
    pub reverse: bool,
}

impl Pair {
    pub fn new(from: CryptoCurrency, to: CryptoCurrency, reverse: bool) -> Self {
        Self { from, to, reverse }
    }

    /// Every (from, to) combination of the supported currencies, filtered by `rule`.
    ///
    /// `rule` returns `Some(reverse)` to include a combination and `None` to drop it.
    pub fn cross_product<F>(rule: F) -> Vec<Pair>
    where
        F: Fn(CryptoCurrency, CryptoCurrency) -> Option<bool>,
    {
        CryptoCurrency::ALL
            .iter()
            .flat_map(|&from| {
                CryptoCurrency::ALL
                    .iter()
                    .filter_map(|&to| rule(from, to).map(|reverse| Pair::new(from, to, reverse)))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn matches(&self, from: CryptoCurrency, to: CryptoCurrency) -> bool {
        self.from == from && self.to == to
    }
}

impl std::fmt::Display for Pair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.from.ticker(), self.to.ticker())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_product_applies_rule() {
        let pairs = Pair::cross_product(|from, to| {
            if from == CryptoCurrency::Dash {
                None
            } else {
                Some(to != CryptoCurrency::Dash)
            }
        });

        let n = CryptoCurrency::ALL.len();
        assert_eq!(pairs.len(), (n - 1) * n);
        assert!(pairs.iter().all(|p| p.from != CryptoCurrency::Dash));
        assert!(pairs
            .iter()
            .filter(|p| p.to == CryptoCurrency::Dash)
            .all(|p| !p.reverse));
    }

    #[test]
    fn test_display_uses_api_tickers() {
        let pair = Pair::new(CryptoCurrency::Bitcoin, CryptoCurrency::Monero, false);
        assert_eq!(pair.to_string(), "btc_xmr");
    }
}
