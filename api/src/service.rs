use common::{
    models::{Amount, CryptoCurrency, ExchangeLimits, ProviderId, Trade, TradeRequest},
    Error, Result,
};
use connectors::{registry::ProviderPair, ProviderRegistry, RequestDispatcher};
use serde::Serialize;
use std::sync::Arc;
use store::{TradeStore, TradeSummary};
use tracing::{debug, error, info};

/// A quote together with the provider that gave it
#[derive(Debug, Clone, Serialize)]
pub struct ProviderQuote {
    pub provider: ProviderId,
    pub amount: Option<Amount>,
    pub error: Option<String>,
}

/// Service routing wallet requests to exchange providers
pub struct ExchangeService {
    /// Providers and the pairs they publish
    registry: ProviderRegistry,
    /// Trade history
    store: Arc<dyn TradeStore>,
    /// Runs provider calls; dropping a request's future cancels the call
    dispatcher: RequestDispatcher,
}

impl ExchangeService {
    pub fn new(
        registry: ProviderRegistry,
        store: Arc<dyn TradeStore>,
        dispatcher: RequestDispatcher,
    ) -> Self {
        Self {
            registry,
            store,
            dispatcher,
        }
    }

    /// List every pair offered by every provider
    pub fn pairs(&self) -> Vec<ProviderPair> {
        self.registry.pairs()
    }

    /// Quote an amount with one provider
    pub async fn quote(
        &self,
        amount: Amount,
        to: CryptoCurrency,
        provider: Option<ProviderId>,
    ) -> Result<ProviderQuote> {
        let provider = self.registry.select(amount.currency(), to, provider)?;
        let id = provider.identity().id;

        debug!("Quoting {} -> {} with {}", amount, to, id);

        let quoted = self
            .dispatcher
            .dispatch(async move { provider.quote(&amount, to).await })
            .await?;

        Ok(ProviderQuote {
            provider: id,
            amount: Some(quoted),
            error: None,
        })
    }

    /// Quote an amount with every provider supporting the pair
    pub async fn quotes(&self, amount: Amount, to: CryptoCurrency) -> Result<Vec<ProviderQuote>> {
        let results = self.registry.quote_all(&self.dispatcher, amount, to).await;

        if results.is_empty() {
            return Err(Error::UnsupportedPair {
                from: amount.currency(),
                to,
            });
        }

        Ok(results
            .into_iter()
            .map(|(provider, result)| match result {
                Ok(amount) => ProviderQuote {
                    provider,
                    amount: Some(amount),
                    error: None,
                },
                Err(e) => {
                    error!("Failed to get {} quote: {}", provider, e);
                    ProviderQuote {
                        provider,
                        amount: None,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect())
    }

    pub async fn limits(
        &self,
        from: CryptoCurrency,
        to: CryptoCurrency,
        provider: Option<ProviderId>,
    ) -> Result<ExchangeLimits> {
        let provider = self.registry.select(from, to, provider)?;

        self.dispatcher
            .dispatch(async move { provider.fetch_limits(from, to).await })
            .await
    }

    /// Create a trade and record it in the trade history
    pub async fn create_trade(
        &self,
        request: TradeRequest,
        provider: Option<ProviderId>,
    ) -> Result<Trade> {
        let provider = self.registry.select(request.from, request.to, provider)?;

        let trade = self
            .dispatcher
            .dispatch(async move { provider.create_trade(&request).await })
            .await?;

        info!("Trade {} created with {}", trade.id, trade.provider);

        // The trade exists remotely now; a history failure must not hide its id
        if let Err(e) = self.store.save(&trade).await {
            error!("Failed to save trade {}: {}", trade.id, e);
        }

        Ok(trade)
    }

    pub async fn trades(&self) -> Result<Vec<TradeSummary>> {
        Ok(self.store.summaries().await?)
    }

    pub async fn trade(&self, id: &str) -> Result<Trade> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Trade with ID '{}' not found", id)))
    }

    /// Poll the provider for a saved trade's status and record any change
    pub async fn refresh_trade(&self, id: &str) -> Result<Trade> {
        let mut trade = self.trade(id).await?;

        if trade.state.is_terminal() {
            debug!("Trade {} is {}, not polling", trade.id, trade.state);
            return Ok(trade);
        }

        let provider = self.registry.get(trade.provider)?;
        let trade_id = trade.id.clone();
        let status = self
            .dispatcher
            .dispatch(async move { provider.fetch_trade_status(&trade_id).await })
            .await?;

        let previous = trade.state;
        trade
            .apply_status(status)
            .map_err(|e| Error::InternalError(e.to_string()))?;

        if trade.state != previous {
            info!("Trade {} moved {} -> {}", trade.id, previous, trade.state);
        }

        self.store.save(&trade).await?;
        Ok(trade)
    }
}
