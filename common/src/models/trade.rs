use crate::models::{Amount, CryptoCurrency};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Exchange provider identifiers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ProviderId {
    #[serde(rename = "changenow")]
    ChangeNow,
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderId::ChangeNow => write!(f, "changenow"),
        }
    }
}

impl std::str::FromStr for ProviderId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "changenow" => Ok(ProviderId::ChangeNow),
            unknown => Err(Error::ParseError(format!(
                "Unknown provider: {}. Supported providers: changenow",
                unknown
            ))),
        }
    }
}

/// Minimum and (when known) maximum amount a provider accepts for a pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExchangeLimits {
    pub min: Amount,
    pub max: Option<Amount>,
}

/// Parameters for creating a trade; addresses are validated by the provider only
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TradeRequest {
    pub from: CryptoCurrency,
    pub to: CryptoCurrency,
    /// Amount to send, denominated in `from`
    pub amount: Amount,
    /// Where the exchanged funds are paid out
    pub address: String,
    /// Where funds go back if the exchange fails
    pub refund_address: String,
}

impl TradeRequest {
    pub fn new(
        to: CryptoCurrency,
        amount: Amount,
        address: impl Into<String>,
        refund_address: impl Into<String>,
    ) -> Self {
        Self {
            from: amount.currency(),
            to,
            amount,
            address: address.into(),
            refund_address: refund_address.into(),
        }
    }
}

/// Lifecycle of a trade as reported by the provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum TradeState {
    /// Registered with the provider, no deposit seen yet
    Created,
    WaitingForConfirmations,
    Confirming,
    Exchanging,
    Sending,
    Finished,
    Failed,
    Refunded,
}

impl TradeState {
    /// Terminal states never change again; pollers stop here.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TradeState::Finished | TradeState::Failed | TradeState::Refunded
        )
    }
}

impl std::fmt::Display for TradeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TradeState::Created => "created",
            TradeState::WaitingForConfirmations => "waitingForConfirmations",
            TradeState::Confirming => "confirming",
            TradeState::Exchanging => "exchanging",
            TradeState::Sending => "sending",
            TradeState::Finished => "finished",
            TradeState::Failed => "failed",
            TradeState::Refunded => "refunded",
        };
        write!(f, "{}", name)
    }
}

/// Result of polling a provider for a trade's progress
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TradeStatus {
    pub state: TradeState,
    /// Payout transaction hash once funds have been sent
    pub output_transaction: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Trade {id} is already {from} and cannot move to {to}")]
    Terminal {
        id: String,
        from: TradeState,
        to: TradeState,
    },
}

/// A trade registered with a provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    /// Provider-assigned identifier
    pub id: String,
    pub provider: ProviderId,
    pub from: CryptoCurrency,
    pub to: CryptoCurrency,
    /// Address the user must send funds to
    pub input_address: String,
    pub amount: Amount,
    pub payout_address: String,
    pub refund_address: Option<String>,
    /// Memo/tag required alongside `input_address` by some currencies
    pub extra_id: Option<String>,
    pub state: TradeState,
    pub output_transaction: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Trade {
    pub fn transition(&mut self, next: TradeState) -> std::result::Result<(), TransitionError> {
        if self.state.is_terminal() {
            return Err(TransitionError::Terminal {
                id: self.id.clone(),
                from: self.state,
                to: next,
            });
        }

        self.state = next;
        Ok(())
    }

    pub fn apply_status(&mut self, status: TradeStatus) -> std::result::Result<(), TransitionError> {
        self.transition(status.state)?;
        if status.output_transaction.is_some() {
            self.output_transaction = status.output_transaction;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn trade() -> Trade {
        Trade {
            id: "abc123".to_string(),
            provider: ProviderId::ChangeNow,
            from: CryptoCurrency::Bitcoin,
            to: CryptoCurrency::Ethereum,
            input_address: "addr1".to_string(),
            amount: Amount::new(CryptoCurrency::Bitcoin, dec!(0.1)).unwrap(),
            payout_address: "addr2".to_string(),
            refund_address: None,
            extra_id: None,
            state: TradeState::Created,
            output_transaction: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(TradeState::Finished.is_terminal());
        assert!(TradeState::Failed.is_terminal());
        assert!(TradeState::Refunded.is_terminal());
        assert!(!TradeState::Created.is_terminal());
        assert!(!TradeState::Sending.is_terminal());
    }

    #[test]
    fn test_progresses_until_terminal() {
        let mut trade = trade();
        for state in [
            TradeState::Confirming,
            TradeState::Exchanging,
            TradeState::Sending,
            TradeState::Finished,
        ] {
            trade.transition(state).unwrap();
        }
        assert_eq!(trade.state, TradeState::Finished);
    }

    #[test]
    fn test_finished_rejects_transition() {
        let mut trade = trade();
        trade.transition(TradeState::Finished).unwrap();

        let err = trade.transition(TradeState::Exchanging).unwrap_err();
        assert_eq!(
            err,
            TransitionError::Terminal {
                id: "abc123".to_string(),
                from: TradeState::Finished,
                to: TradeState::Exchanging,
            }
        );
        assert_eq!(trade.state, TradeState::Finished);
        assert!(trade.transition(TradeState::Finished).is_err());
    }

    #[test]
    fn test_apply_status_records_output_transaction() {
        let mut trade = trade();
        trade
            .apply_status(TradeStatus {
                state: TradeState::Finished,
                output_transaction: Some("0xfeed".to_string()),
            })
            .unwrap();
        assert_eq!(trade.output_transaction.as_deref(), Some("0xfeed"));

        let rejected = trade.apply_status(TradeStatus {
            state: TradeState::Refunded,
            output_transaction: Some("0xbeef".to_string()),
        });
        assert!(rejected.is_err());
        assert_eq!(trade.output_transaction.as_deref(), Some("0xfeed"));
    }

    #[test]
    fn test_request_takes_currency_from_amount() {
        let request = TradeRequest::new(
            CryptoCurrency::Monero,
            Amount::new(CryptoCurrency::Bitcoin, dec!(0.5)).unwrap(),
            "payout",
            "refund",
        );
        assert_eq!(request.from, CryptoCurrency::Bitcoin);
        assert_eq!(request.to, CryptoCurrency::Monero);
    }
}
