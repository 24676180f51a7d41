use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use advice_client::{AdviceClient, AdviceConfig};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use market_data::{TradingEconomicsClient, YahooChartClient};
use momentum_engine::PickEngine;
use picks_core::{EngineConfig, EngineError, SeriesSource};
use serde_json::json;
use tower_http::cors::CorsLayer;

pub mod advice_routes;
pub mod picks_routes;

const LISTING_TIMEOUT: Duration = Duration::from_secs(8);

pub struct AppState {
    pub engine: PickEngine,
    /// The same chart client the engine fetches with, for the holding surface.
    pub series: Arc<dyn SeriesSource>,
    pub advice: Option<AdviceClient>,
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = EngineConfig::from_env();
    let series: Arc<dyn SeriesSource> = Arc::new(YahooChartClient::new());
    let listing = Arc::new(TradingEconomicsClient::new(
        std::env::var("TE_API_KEY").ok(),
        LISTING_TIMEOUT,
    ));
    let advice = AdviceConfig::from_env().map(AdviceClient::new);
    if advice.is_none() {
        tracing::info!("OPENAI_API_KEY not set, advice endpoints disabled");
    }

    let state = Arc::new(AppState {
        engine: PickEngine::new(Arc::clone(&series), listing, cfg),
        series,
        advice,
    });

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .merge(picks_routes::routes())
        .merge(advice_routes::routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Route-level error: bad input from the caller, a disabled surface, or an
/// engine failure that survived every fallback tier.
pub enum AppError {
    BadRequest(String),
    ServiceUnavailable(String),
    Engine(EngineError),
}

impl From<EngineError> for AppError {
    fn from(e: EngineError) -> Self {
        AppError::Engine(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            AppError::ServiceUnavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m),
            AppError::Engine(e) => match e {
                EngineError::NoPool
                | EngineError::Timeout
                | EngineError::Upstream(_)
                | EngineError::Advice(_) => (StatusCode::BAD_GATEWAY, e.to_string()),
                EngineError::InsufficientData(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
                }
            },
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
