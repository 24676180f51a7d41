use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use picks_core::{EngineError, Series, SeriesPoint, SeriesSource};
use reqwest::Client;
use serde::Deserialize;

const BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Unauthenticated Yahoo Finance chart client. Yahoo rejects requests
/// without a browser User-Agent, so one is pinned on the client.
#[derive(Clone)]
pub struct YahooChartClient {
    client: Client,
}

impl YahooChartClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent("Mozilla/5.0")
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    async fn get_chart(
        &self,
        symbol: &str,
        range: &str,
        interval: &str,
    ) -> Result<Series, EngineError> {
        let url = format!("{}/v8/finance/chart/{}", BASE_URL, symbol);

        let response = self
            .client
            .get(&url)
            .query(&[("interval", interval), ("range", range)])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Timeout
                } else {
                    EngineError::Upstream(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(EngineError::Upstream(format!(
                "HTTP {} for {}",
                response.status(),
                symbol
            )));
        }

        let body: ChartResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Upstream(e.to_string()))?;

        decode_chart(body, symbol)
    }
}

impl Default for YahooChartClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SeriesSource for YahooChartClient {
    async fn fetch_series(
        &self,
        symbol: &str,
        range: &str,
        interval: &str,
        timeout: Duration,
    ) -> Result<Series, EngineError> {
        match tokio::time::timeout(timeout, self.get_chart(symbol, range, interval)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(symbol, ?timeout, "chart fetch exceeded its budget");
                Err(EngineError::Timeout)
            }
        }
    }
}

/// Turn the chart payload into a series, preserving nulls as gaps. Close and
/// volume arrays are positionally aligned with the timestamp array.
fn decode_chart(body: ChartResponse, symbol: &str) -> Result<Series, EngineError> {
    let result = body
        .chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
        .ok_or_else(|| EngineError::Upstream(format!("empty chart result for {}", symbol)))?;

    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| EngineError::Upstream(format!("no quote block for {}", symbol)))?;

    let closes = quote.close.unwrap_or_default();
    let volumes = quote.volume.unwrap_or_default();

    let series = timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            DateTime::from_timestamp(ts, 0).map(|ts| SeriesPoint {
                ts,
                close: closes.get(i).copied().flatten(),
                volume: volumes.get(i).copied().flatten(),
            })
        })
        .collect::<Vec<_>>();

    if series.is_empty() {
        return Err(EngineError::Upstream(format!(
            "chart for {} carried no samples",
            symbol
        )));
    }

    Ok(series)
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<f64>>>,
}
