pub mod changenow;
pub mod registry;
pub mod request;

pub use registry::ProviderRegistry;
pub use request::{RequestDispatcher, RequestHandle};

use async_trait::async_trait;
use common::{
    models::{Amount, CryptoCurrency, ExchangeLimits, Pair, ProviderId, Trade, TradeRequest, TradeStatus},
    Result,
};

/// Fixed identity a provider registers with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIdentity {
    /// Display name (e.g., "ChangeNow")
    pub name: String,
    pub id: ProviderId,
}

/// Trait defining the capabilities of an exchange provider.
///
/// Callers hold `Arc<dyn ExchangeProvider>` and never a concrete type, so new
/// providers plug in without touching calling code.
#[async_trait]
pub trait ExchangeProvider: Send + Sync {
    fn identity(&self) -> &ProviderIdentity;

    /// Conversions this provider offers, fixed at construction
    fn pairs(&self) -> &[Pair];

    fn supports(&self, from: CryptoCurrency, to: CryptoCurrency) -> bool {
        self.pairs().iter().any(|pair| pair.matches(from, to))
    }

    /// Estimate how much of `to` the provider pays out for `amount`
    async fn quote(&self, amount: &Amount, to: CryptoCurrency) -> Result<Amount>;

    /// Get the amount bounds the provider accepts for a pair
    async fn fetch_limits(&self, from: CryptoCurrency, to: CryptoCurrency)
        -> Result<ExchangeLimits>;

    /// Register a trade; the returned trade is in the `Created` state
    async fn create_trade(&self, request: &TradeRequest) -> Result<Trade>;

    /// Poll the provider for the current state of a trade
    async fn fetch_trade_status(&self, trade_id: &str) -> Result<TradeStatus>;
}
