use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{
    models::{Amount, CryptoCurrency, ExchangeLimits, ProviderId, Trade, TradeRequest},
    Error as CommonError,
};
use connectors::registry::ProviderPair;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use store::TradeSummary;
use tracing::error;

use crate::service::{ExchangeService, ProviderQuote};

pub type SharedService = Arc<ExchangeService>;

// Create a wrapper for our common::Error type
pub struct ApiError(CommonError);

impl From<CommonError> for ApiError {
    fn from(err: CommonError) -> Self {
        ApiError(err)
    }
}

// Convert our API error wrapper to an Axum response
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CommonError::TradeCreationRefused => StatusCode::UNPROCESSABLE_ENTITY,
            CommonError::TradeCreationFailed(_)
            | CommonError::ExchangeError(_)
            | CommonError::NetworkError(_) => StatusCode::BAD_GATEWAY,
            CommonError::ParseError(_)
            | CommonError::UnsupportedPair { .. }
            | CommonError::CurrencyMismatch { .. } => StatusCode::BAD_REQUEST,
            CommonError::NotFound(_) => StatusCode::NOT_FOUND,
            CommonError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            CommonError::DbError(_)
            | CommonError::ConfigError(_)
            | CommonError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }

        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

fn parse_currency(raw: &str) -> Result<CryptoCurrency, ApiError> {
    Ok(raw.parse::<CryptoCurrency>()?)
}

fn parse_provider(raw: Option<&str>) -> Result<Option<ProviderId>, ApiError> {
    raw.map(|p| p.parse::<ProviderId>())
        .transpose()
        .map_err(ApiError::from)
}

// List every pair the registered providers offer
pub async fn list_pairs(State(service): State<SharedService>) -> Json<Vec<ProviderPair>> {
    Json(service.pairs())
}

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub from: String,
    pub to: String,
    pub amount: String,
    pub provider: Option<String>,
}

pub async fn get_quote(
    State(service): State<SharedService>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<ProviderQuote>, ApiError> {
    let from = parse_currency(&query.from)?;
    let to = parse_currency(&query.to)?;
    let amount = Amount::parse(from, &query.amount)?;
    let provider = parse_provider(query.provider.as_deref())?;

    let quote = service.quote(amount, to, provider).await?;
    Ok(Json(quote))
}

// Compare quotes across all providers supporting the pair
pub async fn get_quotes(
    State(service): State<SharedService>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<Vec<ProviderQuote>>, ApiError> {
    let from = parse_currency(&query.from)?;
    let to = parse_currency(&query.to)?;
    let amount = Amount::parse(from, &query.amount)?;

    let quotes = service.quotes(amount, to).await?;
    Ok(Json(quotes))
}

#[derive(Debug, Deserialize)]
pub struct LimitsQuery {
    pub from: String,
    pub to: String,
    pub provider: Option<String>,
}

pub async fn get_limits(
    State(service): State<SharedService>,
    Query(query): Query<LimitsQuery>,
) -> Result<Json<ExchangeLimits>, ApiError> {
    let from = parse_currency(&query.from)?;
    let to = parse_currency(&query.to)?;
    let provider = parse_provider(query.provider.as_deref())?;

    let limits = service.limits(from, to, provider).await?;
    Ok(Json(limits))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTradeBody {
    pub from: String,
    pub to: String,
    pub amount: String,
    pub address: String,
    pub refund_address: String,
    pub provider: Option<String>,
}

pub async fn create_trade(
    State(service): State<SharedService>,
    Json(body): Json<CreateTradeBody>,
) -> Result<(StatusCode, Json<Trade>), ApiError> {
    let from = parse_currency(&body.from)?;
    let to = parse_currency(&body.to)?;
    let amount = Amount::parse(from, &body.amount)?;
    let provider = parse_provider(body.provider.as_deref())?;

    let request = TradeRequest::new(to, amount, body.address, body.refund_address);
    let trade = service.create_trade(request, provider).await?;
    Ok((StatusCode::CREATED, Json(trade)))
}

pub async fn list_trades(
    State(service): State<SharedService>,
) -> Result<Json<Vec<TradeSummary>>, ApiError> {
    Ok(Json(service.trades().await?))
}

pub async fn get_trade(
    State(service): State<SharedService>,
    Path(id): Path<String>,
) -> Result<Json<Trade>, ApiError> {
    Ok(Json(service.trade(&id).await?))
}

// Poll the provider and return the updated trade
pub async fn refresh_trade(
    State(service): State<SharedService>,
    Path(id): Path<String>,
) -> Result<Json<Trade>, ApiError> {
    Ok(Json(service.refresh_trade(&id).await?))
}
