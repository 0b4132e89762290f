use crate::{ExchangeProvider, ProviderIdentity};
use async_trait::async_trait;
use chrono::Utc;
use common::{
    models::{
        Amount, CryptoCurrency, ExchangeLimits, Pair, ProviderId, Trade, TradeRequest, TradeState,
        TradeStatus,
    },
    Error, Result,
};
use reqwest::{StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

const CHANGENOW_API_URL: &str = "https://changenow.io/api/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// Both spellings count as a refusal
const REFUSED_ERRORS: [&str; 2] = ["cannot_create_transaction", "cannot_create_transction"];

/// Configuration for the ChangeNow provider
#[derive(Debug, Clone)]
pub struct ChangeNowConfig {
    /// Versioned API base, e.g. "https://changenow.io/api/v1"
    pub base_url: String,
    pub api_key: String,
    /// Per-request timeout, covering connect through body read
    pub timeout: Duration,
}

impl ChangeNowConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: CHANGENOW_API_URL.to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Create a provider configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("CHANGENOW_API_KEY").map_err(|_| {
            Error::ConfigError("CHANGENOW_API_KEY environment variable not set".to_string())
        })?;
        let base_url =
            std::env::var("CHANGENOW_API_URL").unwrap_or_else(|_| CHANGENOW_API_URL.to_string());
        let timeout = std::env::var("CHANGENOW_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self {
            base_url,
            api_key,
            timeout: Duration::from_secs(timeout),
        })
    }
}

pub struct ChangeNowProvider {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
    identity: ProviderIdentity,
    pairs: Vec<Pair>,
}

impl ChangeNowProvider {
    pub fn new(config: ChangeNowConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            Error::ConfigError(format!("Invalid ChangeNow URL '{}': {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::ConfigError(format!(
                "ChangeNow URL '{}' cannot be used as a base",
                config.base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(Error::NetworkError)?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
            identity: ProviderIdentity {
                name: "ChangeNow".to_string(),
                id: ProviderId::ChangeNow,
            },
            pairs: Self::supported_pairs(),
        })
    }

    /// Every currency combination, except that XMR -> BTC is left to other
    /// providers and BTC -> XMR is one-directional here.
    pub fn supported_pairs() -> Vec<Pair> {
        Pair::cross_product(|from, to| match (from, to) {
            (CryptoCurrency::Bitcoin, CryptoCurrency::Monero) => Some(false),
            (CryptoCurrency::Monero, CryptoCurrency::Bitcoin) => None,
            _ => Some(true),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in new(), so this always succeeds
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// URL text safe to log; the API key travels in the path
    fn redact(&self, url: &Url) -> String {
        if self.api_key.is_empty() {
            return url.to_string();
        }
        url.as_str().replace(&self.api_key, "<api-key>")
    }

    fn pair_segment(from: CryptoCurrency, to: CryptoCurrency) -> String {
        format!("{}_{}", from.ticker(), to.ticker())
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<(StatusCode, Vec<u8>)> {
        let response = request.send().await.map_err(Error::NetworkError)?;
        let status = response.status();
        let body = response.bytes().await.map_err(Error::NetworkError)?;
        Ok((status, body.to_vec()))
    }

    /// One GET round trip, mapping remote errors to `ExchangeError` and
    /// unreadable bodies to `ParseError`
    async fn get<T: DeserializeOwned>(&self, url: Url, context: &str) -> Result<T> {
        debug!("Fetching {} from ChangeNow: {}", context, self.redact(&url));

        let (status, body) = self.send(self.client.get(url)).await?;

        if let Some(remote) = remote_error(&body) {
            error!("ChangeNow API error: {} - {}", status, remote.describe());
            return Err(Error::ExchangeError(remote.describe()));
        }

        if !status.is_success() {
            // A body that is not JSON at all (e.g. a proxy error page) is a parse failure
            let _: serde_json::Value = decode(&body, context)?;
            let error_text = String::from_utf8_lossy(&body);
            error!("ChangeNow API error: {} - {}", status, error_text);
            return Err(Error::ExchangeError(format!(
                "ChangeNow API error: {} - {}",
                status, error_text
            )));
        }

        decode(&body, context)
    }
}

#[derive(Debug, Deserialize)]
struct RemoteError {
    error: Option<String>,
    message: Option<String>,
}

impl RemoteError {
    fn describe(&self) -> String {
        match (&self.error, &self.message) {
            (Some(error), Some(message)) => format!("{}: {}", error, message),
            (Some(error), None) => error.clone(),
            (None, Some(message)) => message.clone(),
            (None, None) => String::new(),
        }
    }
}

fn remote_error(body: &[u8]) -> Option<RemoteError> {
    serde_json::from_slice::<RemoteError>(body)
        .ok()
        .filter(|remote| remote.error.is_some())
}

fn decode<T: DeserializeOwned>(body: &[u8], context: &str) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        error!("Empty ChangeNow {} response", context);
        return Err(Error::ParseError(format!(
            "Empty ChangeNow {} response",
            context
        )));
    }

    serde_json::from_slice(body).map_err(|e| {
        error!(
            "Failed to parse ChangeNow {} response: {} - body: {}",
            context,
            e,
            String::from_utf8_lossy(body)
        );
        Error::ParseError(format!("Failed to parse ChangeNow {} response: {}", context, e))
    })
}

/// Decimal fields arrive either as strings or as bare JSON numbers
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDecimal {
    Text(String),
    Number(serde_json::Number),
}

impl RawDecimal {
    fn into_amount(self, currency: CryptoCurrency) -> Result<Amount> {
        match self {
            RawDecimal::Text(text) => Amount::parse(currency, &text),
            RawDecimal::Number(number) => Amount::parse(currency, &number.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EstimateResponse {
    estimated_amount: RawDecimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MinAmountResponse {
    min_amount: RawDecimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTransactionBody<'a> {
    from: &'a str,
    to: &'a str,
    address: &'a str,
    amount: String,
    refund_address: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedTransaction {
    id: String,
    payin_address: String,
    payout_address: String,
    refund_address: Option<String>,
    payin_extra_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionStatus {
    status: String,
    payout_hash: Option<String>,
}

fn trade_state(status: &str) -> Result<TradeState> {
    match status {
        "new" | "waiting" => Ok(TradeState::Created),
        "verifying" => Ok(TradeState::WaitingForConfirmations),
        "confirming" => Ok(TradeState::Confirming),
        "exchanging" => Ok(TradeState::Exchanging),
        "sending" => Ok(TradeState::Sending),
        "finished" => Ok(TradeState::Finished),
        "failed" | "expired" => Ok(TradeState::Failed),
        "refunded" => Ok(TradeState::Refunded),
        unknown => Err(Error::ParseError(format!(
            "Unknown ChangeNow trade status: {}",
            unknown
        ))),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[async_trait]
impl ExchangeProvider for ChangeNowProvider {
    fn identity(&self) -> &ProviderIdentity {
        &self.identity
    }

    fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    async fn quote(&self, amount: &Amount, to: CryptoCurrency) -> Result<Amount> {
        let value = amount.formatted();
        let pair = Self::pair_segment(amount.currency(), to);
        let url = self.endpoint(&["exchange-amount", value.as_str(), pair.as_str()]);

        let estimate: EstimateResponse = self.get(url, "estimate").await?;
        estimate.estimated_amount.into_amount(to)
    }

    async fn fetch_limits(
        &self,
        from: CryptoCurrency,
        to: CryptoCurrency,
    ) -> Result<ExchangeLimits> {
        let pair = Self::pair_segment(from, to);
        let url = self.endpoint(&["min-amount", pair.as_str()]);

        let limits: MinAmountResponse = self.get(url, "min-amount").await?;

        // The API publishes no upper bound
        Ok(ExchangeLimits {
            min: limits.min_amount.into_amount(to)?,
            max: None,
        })
    }

    async fn create_trade(&self, request: &TradeRequest) -> Result<Trade> {
        if request.amount.currency() != request.from {
            return Err(Error::CurrencyMismatch {
                expected: request.from,
                found: request.amount.currency(),
            });
        }

        let url = self.endpoint(&["transactions", self.api_key.as_str()]);
        let body = CreateTransactionBody {
            from: request.from.ticker(),
            to: request.to.ticker(),
            address: &request.address,
            amount: request.amount.formatted(),
            refund_address: &request.refund_address,
        };

        debug!(
            "Creating ChangeNow trade {} {} -> {}",
            request.amount, request.from, request.to
        );

        let (status, response) = self.send(self.client.post(url).json(&body)).await?;

        if let Some(remote) = remote_error(&response) {
            let message = remote.error.unwrap_or_default();
            error!("ChangeNow refused trade: {} - {}", status, message);
            if REFUSED_ERRORS.contains(&message.as_str()) {
                return Err(Error::TradeCreationRefused);
            }
            return Err(Error::TradeCreationFailed(message));
        }

        if !status.is_success() {
            let _: serde_json::Value = decode(&response, "transaction")?;
            let error_text = String::from_utf8_lossy(&response);
            error!("ChangeNow API error: {} - {}", status, error_text);
            return Err(Error::TradeCreationFailed(format!(
                "ChangeNow API error: {} - {}",
                status, error_text
            )));
        }

        let created: CreatedTransaction = decode(&response, "transaction")?;
        if created.id.trim().is_empty() || created.payin_address.trim().is_empty() {
            error!(
                "ChangeNow transaction response is missing id or payin address: {}",
                String::from_utf8_lossy(&response)
            );
            return Err(Error::ParseError(
                "ChangeNow transaction response is missing id or payin address".to_string(),
            ));
        }

        info!("Created ChangeNow trade {}", created.id);

        Ok(Trade {
            id: created.id,
            provider: self.identity.id,
            from: request.from,
            to: request.to,
            input_address: created.payin_address,
            amount: request.amount,
            payout_address: created.payout_address,
            refund_address: non_empty(created.refund_address),
            extra_id: non_empty(created.payin_extra_id),
            state: TradeState::Created,
            output_transaction: None,
            created_at: Utc::now(),
        })
    }

    async fn fetch_trade_status(&self, trade_id: &str) -> Result<TradeStatus> {
        let url = self.endpoint(&["transactions", trade_id, self.api_key.as_str()]);

        let status: TransactionStatus = self.get(url, "transaction status").await?;

        Ok(TradeStatus {
            state: trade_state(&status.status)?,
            output_transaction: non_empty(status.payout_hash),
        })
    }
}
