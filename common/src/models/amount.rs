use crate::models::CryptoCurrency;
use crate::{Error, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A monetary value denominated in one currency.
///
/// The value is truncated to the currency's precision on construction, so two
/// amounts compare equal exactly when the exchange would treat them the same.
/// Values are never negative, including ones read back from storage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "StoredAmount")]
pub struct Amount {
    currency: CryptoCurrency,
    value: Decimal,
}

#[derive(Deserialize)]
struct StoredAmount {
    currency: CryptoCurrency,
    value: Decimal,
}

impl TryFrom<StoredAmount> for Amount {
    type Error = Error;

    fn try_from(stored: StoredAmount) -> Result<Self> {
        Amount::new(stored.currency, stored.value)
    }
}

impl Amount {
    pub fn new(currency: CryptoCurrency, value: Decimal) -> Result<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(Error::ParseError(format!(
                "Negative amount: {} {}",
                value, currency
            )));
        }
        Ok(Self::truncated(currency, value))
    }

    fn truncated(currency: CryptoCurrency, value: Decimal) -> Self {
        let value = value
            .abs()
            .round_dp_with_strategy(currency.decimals(), RoundingStrategy::ToZero)
            .normalize();
        Self { currency, value }
    }

    /// Parse a decimal string such as "0.002" into an amount of `currency`
    pub fn parse(currency: CryptoCurrency, raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::ParseError(format!(
                "Empty {} amount",
                currency.formatted()
            )));
        }

        let value = Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|e| Error::ParseError(format!("Invalid amount '{}': {}", raw, e)))?;

        Self::new(currency, value)
    }

    pub fn zero(currency: CryptoCurrency) -> Self {
        Self::truncated(currency, Decimal::ZERO)
    }

    pub fn currency(&self) -> CryptoCurrency {
        self.currency
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    /// Value without trailing zeros (e.g., "1.5"), as sent to exchange APIs
    pub fn formatted(&self) -> String {
        self.value.normalize().to_string()
    }

    pub fn checked_add(&self, other: &Amount) -> Result<Amount> {
        self.ensure_same_currency(other)?;
        let value = self
            .value
            .checked_add(other.value)
            .ok_or_else(|| Error::ParseError(format!("Amount overflow: {} + {}", self, other)))?;
        Ok(Self::truncated(self.currency, value))
    }

    pub fn checked_sub(&self, other: &Amount) -> Result<Amount> {
        self.ensure_same_currency(other)?;
        if other.value > self.value {
            return Err(Error::ParseError(format!(
                "Amount underflow: {} - {}",
                self, other
            )));
        }
        Ok(Self::truncated(self.currency, self.value - other.value))
    }
    fn ensure_same_currency(&self, other: &Amount) -> Result<()> {
        if self.currency != other.currency {
            return Err(Error::CurrencyMismatch {
                expected: self.currency,
                found: other.currency,
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.formatted(), self.currency)
    }
}
