use std::sync::Arc;
use std::time::Duration;

use advice_client::TradeConstraints;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use picks_core::{chart_symbol, HoldingSummary, RankedResult, SeriesSource, UniverseProfile};
use serde::{Deserialize, Serialize};

use crate::picks_routes::validate_n;
use crate::{AppError, AppState};

/// Lookback window for judging an open holding.
const HOLDING_RANGE: &str = "3mo";
const HOLDING_INTERVAL: &str = "1d";
const HOLDING_FETCH_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviceQuery {
    #[serde(default = "default_size")]
    pub size: UniverseProfile,
    #[serde(default = "default_n")]
    pub n: usize,
    #[serde(default = "default_capital")]
    pub capital: f64,
    #[serde(default = "default_target_pct")]
    pub target_pct: f64,
    #[serde(default = "default_stop_pct")]
    pub stop_pct: f64,
}

fn default_size() -> UniverseProfile {
    UniverseProfile::Small
}

fn default_n() -> usize {
    3
}

fn default_capital() -> f64 {
    1000.0
}

fn default_target_pct() -> f64 {
    8.0
}

fn default_stop_pct() -> f64 {
    5.0
}

#[derive(Debug, Serialize)]
pub struct AdviceEnvelope {
    pub picks: RankedResult,
    pub advice: serde_json::Value,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/advice", get(get_advice))
        .route("/api/advice/holding", get(get_holding_advice))
}

async fn get_advice(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdviceQuery>,
) -> Result<Json<AdviceEnvelope>, AppError> {
    validate_n(query.n)?;
    if query.capital <= 0.0 {
        return Err(AppError::BadRequest("capital must be positive".to_string()));
    }

    let client = state.advice.as_ref().ok_or_else(|| {
        AppError::ServiceUnavailable("advice service is not configured".to_string())
    })?;

    let picks = state.engine.top_picks(query.size, query.n).await?;
    let constraints = TradeConstraints {
        capital: query.capital,
        target_pct: query.target_pct,
        stop_pct: query.stop_pct,
    };
    let advice = client.advise(&picks, &constraints).await?;

    Ok(Json(AdviceEnvelope { picks, advice }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingQuery {
    pub symbol: String,
    pub entry: f64,
    #[serde(default)]
    pub purchased_at: Option<String>,
    #[serde(default = "default_capital")]
    pub capital: f64,
    #[serde(default = "default_target_pct")]
    pub target_pct: f64,
    #[serde(default = "default_stop_pct")]
    pub stop_pct: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingEnvelope {
    pub symbol: String,
    pub summary: HoldingSummary,
    pub advice: serde_json::Value,
}

async fn get_holding_advice(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HoldingQuery>,
) -> Result<Json<HoldingEnvelope>, AppError> {
    let symbol = query.symbol.trim().to_ascii_uppercase();
    if symbol.is_empty() {
        return Err(AppError::BadRequest("missing symbol".to_string()));
    }
    if query.entry <= 0.0 {
        return Err(AppError::BadRequest("entry must be positive".to_string()));
    }
    let from = match query.purchased_at.as_deref() {
        Some(raw) => Some(parse_purchase_date(raw).ok_or_else(|| {
            AppError::BadRequest("purchasedAt must be an ISO date".to_string())
        })?),
        None => None,
    };

    let client = state.advice.as_ref().ok_or_else(|| {
        AppError::ServiceUnavailable("advice service is not configured".to_string())
    })?;

    let series = state
        .series
        .fetch_series(
            &chart_symbol(&symbol),
            HOLDING_RANGE,
            HOLDING_INTERVAL,
            HOLDING_FETCH_TIMEOUT,
        )
        .await?;
    let summary = momentum_engine::features::summarize_since(&series, from);

    let constraints = TradeConstraints {
        capital: query.capital,
        target_pct: query.target_pct,
        stop_pct: query.stop_pct,
    };
    let advice = client
        .advise_holding(
            &symbol,
            query.entry,
            query.purchased_at.as_deref(),
            &summary,
            &constraints,
        )
        .await?;

    Ok(Json(HoldingEnvelope {
        symbol,
        summary,
        advice,
    }))
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DD`, read as midnight UTC.
fn parse_purchase_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mirror_the_original_guidance() {
        assert_eq!(default_capital(), 1000.0);
        assert_eq!(default_target_pct(), 8.0);
        assert_eq!(default_stop_pct(), 5.0);
    }

    #[test]
    fn purchase_date_accepts_both_spellings() {
        let plain = parse_purchase_date("2026-07-01").unwrap();
        assert_eq!(plain.to_rfc3339(), "2026-07-01T00:00:00+00:00");
        let full = parse_purchase_date("2026-07-01T10:30:00+10:00").unwrap();
        assert_eq!(full, "2026-07-01T00:30:00Z".parse::<DateTime<Utc>>().unwrap());
        assert!(parse_purchase_date("last tuesday").is_none());
    }
}
