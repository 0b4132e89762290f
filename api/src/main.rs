mod config;
mod handler;
mod service;

use axum::{
    routing::{get, post},
    Router,
};
use config::ApiConfig;
use connectors::{
    changenow::{ChangeNowConfig, ChangeNowProvider},
    ExchangeProvider, ProviderRegistry, RequestDispatcher,
};
use service::ExchangeService;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting exchange API");

    // Load configuration from environment
    let api_config = ApiConfig::from_env();
    let changenow_config = ChangeNowConfig::from_env()?;
    let store_config = store::StoreConfig::from_env()
        .map_err(|e| format!("Failed to load store configuration: {}", e))?;

    let trade_store = store::open_store(&store_config)
        .await
        .map_err(|e| format!("Failed to open trade store: {}", e))?;

    // Providers and their pairs are fixed from here on
    let changenow: Arc<dyn ExchangeProvider> = Arc::new(ChangeNowProvider::new(changenow_config)?);
    let registry = ProviderRegistry::new(vec![changenow]);

    let service = Arc::new(ExchangeService::new(
        registry,
        trade_store,
        RequestDispatcher::bounded(api_config.max_in_flight),
    ));

    // Create CORS middleware
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/v1/pairs", get(handler::list_pairs))
        .route("/api/v1/quote", get(handler::get_quote))
        .route("/api/v1/quotes", get(handler::get_quotes))
        .route("/api/v1/limits", get(handler::get_limits))
        .route(
            "/api/v1/trades",
            get(handler::list_trades).post(handler::create_trade),
        )
        .route("/api/v1/trades/:id", get(handler::get_trade))
        .route("/api/v1/trades/:id/refresh", post(handler::refresh_trade))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(service);

    let addr: SocketAddr = format!("{}:{}", api_config.host, api_config.port)
        .parse()
        .map_err(|e| format!("Invalid listen address: {}", e))?;
    info!("Listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
