use crate::{ExchangeProvider, RequestDispatcher};
use common::{
    models::{Amount, CryptoCurrency, Pair, ProviderId},
    Error, Result,
};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// A pair as published by a specific provider
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProviderPair {
    pub provider: ProviderId,
    #[serde(flatten)]
    pub pair: Pair,
}

/// Immutable set of providers, built once at startup
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn ExchangeProvider>>,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<Arc<dyn ExchangeProvider>>) -> Self {
        for provider in &providers {
            debug!(
                "Registered provider {} with {} pairs",
                provider.identity().name,
                provider.pairs().len()
            );
        }
        Self { providers }
    }

    pub fn get(&self, id: ProviderId) -> Result<Arc<dyn ExchangeProvider>> {
        self.providers
            .iter()
            .find(|provider| provider.identity().id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Provider '{}' is not registered", id)))
    }

    /// Every conversion offered, tagged with the provider offering it
    pub fn pairs(&self) -> Vec<ProviderPair> {
        self.providers
            .iter()
            .flat_map(|provider| {
                let id = provider.identity().id;
                provider
                    .pairs()
                    .iter()
                    .map(move |pair| ProviderPair { provider: id, pair: *pair })
            })
            .collect()
    }

    pub fn providers_for(
        &self,
        from: CryptoCurrency,
        to: CryptoCurrency,
    ) -> Vec<Arc<dyn ExchangeProvider>> {
        self.providers
            .iter()
            .filter(|provider| provider.supports(from, to))
            .cloned()
            .collect()
    }

    /// Pick the preferred provider if it supports the pair, else the first that does
    pub fn select(
        &self,
        from: CryptoCurrency,
        to: CryptoCurrency,
        preferred: Option<ProviderId>,
    ) -> Result<Arc<dyn ExchangeProvider>> {
        let provider = match preferred {
            Some(id) => Some(self.get(id)?).filter(|provider| provider.supports(from, to)),
            None => self.providers_for(from, to).into_iter().next(),
        };

        provider.ok_or(Error::UnsupportedPair { from, to })
    }

    /// Quote `amount` with every provider supporting the pair. Each quote is
    /// its own dispatched request, so the dispatcher's bound applies per call.
    pub async fn quote_all(
        &self,
        dispatcher: &RequestDispatcher,
        amount: Amount,
        to: CryptoCurrency,
    ) -> Vec<(ProviderId, Result<Amount>)> {
        let quotes = self
            .providers_for(amount.currency(), to)
            .into_iter()
            .map(|provider| {
                let id = provider.identity().id;
                let handle = dispatcher.dispatch(async move { provider.quote(&amount, to).await });
                async move { (id, handle.await) }
            });

        join_all(quotes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderIdentity;
    use async_trait::async_trait;
    use common::models::{ExchangeLimits, Trade, TradeRequest, TradeStatus};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FixedRateProvider {
        identity: ProviderIdentity,
        pairs: Vec<Pair>,
    }

    impl FixedRateProvider {
        fn new() -> Self {
            Self {
                identity: ProviderIdentity {
                    name: "Fixed".to_string(),
                    id: ProviderId::ChangeNow,
                },
                pairs: vec![Pair::new(CryptoCurrency::Litecoin, CryptoCurrency::Dash, true)],
            }
        }
    }

    #[async_trait]
    impl ExchangeProvider for FixedRateProvider {
        fn identity(&self) -> &ProviderIdentity {
            &self.identity
        }

        fn pairs(&self) -> &[Pair] {
            &self.pairs
        }

        async fn quote(&self, amount: &Amount, to: CryptoCurrency) -> Result<Amount> {
            Amount::new(to, amount.value() * dec!(2))
        }

        async fn fetch_limits(
            &self,
            _from: CryptoCurrency,
            to: CryptoCurrency,
        ) -> Result<ExchangeLimits> {
            Ok(ExchangeLimits {
                min: Amount::new(to, dec!(1))?,
                max: None,
            })
        }

        async fn create_trade(&self, _request: &TradeRequest) -> Result<Trade> {
            Err(Error::TradeCreationRefused)
        }

        async fn fetch_trade_status(&self, trade_id: &str) -> Result<TradeStatus> {
            Err(Error::NotFound(trade_id.to_string()))
        }
    }

    fn registry() -> ProviderRegistry {
        ProviderRegistry::new(vec![Arc::new(FixedRateProvider::new())])
    }

    #[test]
    fn test_select_supported_pair() {
        let registry = registry();
        let provider = registry
            .select(CryptoCurrency::Litecoin, CryptoCurrency::Dash, None)
            .unwrap();
        assert_eq!(provider.identity().name, "Fixed");

        assert!(registry
            .select(CryptoCurrency::Litecoin, CryptoCurrency::Dash, Some(ProviderId::ChangeNow))
            .is_ok());
    }

    #[test]
    fn test_select_unsupported_pair() {
        let result = registry().select(CryptoCurrency::Dash, CryptoCurrency::Litecoin, None);
        assert!(matches!(
            result,
            Err(Error::UnsupportedPair {
                from: CryptoCurrency::Dash,
                to: CryptoCurrency::Litecoin
            })
        ));
    }

    #[test]
    fn test_pairs_are_tagged() {
        let pairs = registry().pairs();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].provider, ProviderId::ChangeNow);
        assert!(pairs[0].pair.matches(CryptoCurrency::Litecoin, CryptoCurrency::Dash));
    }

    #[tokio::test]
    async fn test_quote_all() {
        let dispatcher = RequestDispatcher::new();
        let amount = Amount::new(CryptoCurrency::Litecoin, dec!(1.25)).unwrap();
        let quotes = registry()
            .quote_all(&dispatcher, amount, CryptoCurrency::Dash)
            .await;

        assert_eq!(quotes.len(), 1);
        let (id, quote) = &quotes[0];
        assert_eq!(*id, ProviderId::ChangeNow);
        assert_eq!(quote.as_ref().unwrap().value(), dec!(2.5));

        let none = registry()
            .quote_all(&dispatcher, amount, CryptoCurrency::Tron)
            .await;
        assert!(none.is_empty());
    }

    /// Counts how many quotes run at the same time
    struct SlowProvider {
        identity: ProviderIdentity,
        pairs: Vec<Pair>,
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ExchangeProvider for SlowProvider {
        fn identity(&self) -> &ProviderIdentity {
            &self.identity
        }

        fn pairs(&self) -> &[Pair] {
            &self.pairs
        }

        async fn quote(&self, amount: &Amount, to: CryptoCurrency) -> Result<Amount> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            Amount::new(to, amount.value())
        }

        async fn fetch_limits(
            &self,
            _from: CryptoCurrency,
            to: CryptoCurrency,
        ) -> Result<ExchangeLimits> {
            Ok(ExchangeLimits {
                min: Amount::zero(to),
                max: None,
            })
        }

        async fn create_trade(&self, _request: &TradeRequest) -> Result<Trade> {
            Err(Error::TradeCreationRefused)
        }

        async fn fetch_trade_status(&self, trade_id: &str) -> Result<TradeStatus> {
            Err(Error::NotFound(trade_id.to_string()))
        }
    }

    #[tokio::test]
    async fn test_quote_all_respects_dispatcher_bound() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let providers: Vec<Arc<dyn ExchangeProvider>> = (0..3)
            .map(|i| {
                Arc::new(SlowProvider {
                    identity: ProviderIdentity {
                        name: format!("Slow {}", i),
                        id: ProviderId::ChangeNow,
                    },
                    pairs: vec![Pair::new(CryptoCurrency::Litecoin, CryptoCurrency::Dash, false)],
                    running: running.clone(),
                    peak: peak.clone(),
                }) as Arc<dyn ExchangeProvider>
            })
            .collect();
        let registry = ProviderRegistry::new(providers);

        let amount = Amount::new(CryptoCurrency::Litecoin, dec!(1)).unwrap();
        let quotes = registry
            .quote_all(&RequestDispatcher::bounded(1), amount, CryptoCurrency::Dash)
            .await;

        assert_eq!(quotes.len(), 3);
        assert!(quotes.iter().all(|(_, quote)| quote.is_ok()));
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }
}
