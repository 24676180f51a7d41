use std::time::Duration;

use async_trait::async_trait;
use picks_core::{EngineError, ListingRow, ListingSource};
use reqwest::Client;
use serde::Deserialize;

const BASE_URL: &str = "https://api.tradingeconomics.com";

/// TradingEconomics country-listing client. Works against the guest tier,
/// which needs no account but trims some fields.
#[derive(Clone)]
pub struct TradingEconomicsClient {
    client: Client,
    api_key: String,
}

impl TradingEconomicsClient {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_key: api_key.unwrap_or_else(|| "guest:guest".to_string()),
        }
    }
}

#[async_trait]
impl ListingSource for TradingEconomicsClient {
    async fn fetch_universe(&self, region: &str) -> Result<Vec<ListingRow>, EngineError> {
        let url = format!("{}/markets/stocks/country/{}", BASE_URL, region);

        let response = self
            .client
            .get(&url)
            .query(&[("c", self.api_key.as_str()), ("f", "json")])
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
                "HTTP {} from listing source",
                response.status()
            )));
        }

        let entries: Vec<ListingEntry> = response
            .json()
            .await
            .map_err(|e| EngineError::Upstream(e.to_string()))?;

        let rows: Vec<ListingRow> = entries.into_iter().filter_map(to_row).collect();
        tracing::debug!(region, rows = rows.len(), "listing fetched");
        Ok(rows)
    }
}

/// Rows without a symbol or a last price are unusable and dropped here.
fn to_row(entry: ListingEntry) -> Option<ListingRow> {
    let symbol = entry.symbol?;
    let last = entry.last?;
    Some(ListingRow {
        name: entry.name.unwrap_or_else(|| symbol.clone()),
        symbol,
        last: Some(last),
        market_cap: entry.market_cap,
        daily_change_pct: entry.daily_percentual_change,
        weekly_change_pct: entry.weekly_percentual_change,
        monthly_change_pct: entry.monthly_percentual_change,
    })
}

/// The vendor has shipped both PascalCase and snake_case spellings of this
/// payload; aliases accept either.
#[derive(Debug, Deserialize)]
struct ListingEntry {
    #[serde(alias = "Symbol")]
    symbol: Option<String>,
    #[serde(alias = "Name")]
    name: Option<String>,
    #[serde(alias = "Last")]
    last: Option<f64>,
    #[serde(alias = "MarketCap")]
    market_cap: Option<f64>,
    #[serde(alias = "DailyPercentualChange")]
    daily_percentual_change: Option<f64>,
    #[serde(alias = "WeeklyPercentualChange")]
    weekly_percentual_change: Option<f64>,
    #[serde(alias = "MonthlyPercentualChange")]
    monthly_percentual_change: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_pascal_case_fields() {
        let entries: Vec<ListingEntry> = serde_json::from_str(
            r#"[{"Symbol":"BHP:AU","Name":"BHP Group","Last":45.1,
                 "DailyPercentualChange":1.2,"WeeklyPercentualChange":3.4,
                 "MonthlyPercentualChange":-0.5,"MarketCap":2.3e11}]"#,
        )
        .unwrap();
        let row = to_row(entries.into_iter().next().unwrap()).unwrap();
        assert_eq!(row.symbol, "BHP:AU");
        assert_eq!(row.daily_change_pct, Some(1.2));
        assert_eq!(row.market_cap, Some(2.3e11));
    }

    #[test]
    fn accepts_snake_case_fields() {
        let entries: Vec<ListingEntry> = serde_json::from_str(
            r#"[{"symbol":"WES:AU","name":"Wesfarmers","last":60.0,
                 "daily_percentual_change":0.8,"market_cap":7.0e10}]"#,
        )
        .unwrap();
        let row = to_row(entries.into_iter().next().unwrap()).unwrap();
        assert_eq!(row.symbol, "WES:AU");
        assert_eq!(row.daily_change_pct, Some(0.8));
        assert_eq!(row.weekly_change_pct, None);
    }

    #[test]
    fn drops_rows_without_symbol_or_last() {
        let entries: Vec<ListingEntry> = serde_json::from_str(
            r#"[{"Symbol":"BHP:AU","Name":"BHP Group"},
                {"Name":"Orphan Co","Last":1.0},
                {"Symbol":"WOW:AU","Name":"Woolworths","Last":30.0}]"#,
        )
        .unwrap();
        let rows: Vec<ListingRow> = entries.into_iter().filter_map(to_row).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "WOW:AU");
    }

    #[test]
    fn falls_back_to_symbol_when_name_missing() {
        let entries: Vec<ListingEntry> =
            serde_json::from_str(r#"[{"Symbol":"TLS:AU","Last":4.0}]"#).unwrap();
        let row = to_row(entries.into_iter().next().unwrap()).unwrap();
        assert_eq!(row.name, "TLS:AU");
    }
}
