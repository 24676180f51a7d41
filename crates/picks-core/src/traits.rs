use std::time::Duration;

use async_trait::async_trait;

use crate::{EngineError, ListingRow, Series};

/// Best-effort time-series source. One outbound call per invocation, bounded
/// by `timeout`; retry and fallback policy live with the caller.
#[async_trait]
pub trait SeriesSource: Send + Sync {
    async fn fetch_series(
        &self,
        symbol: &str,
        range: &str,
        interval: &str,
        timeout: Duration,
    ) -> Result<Series, EngineError>;
}

/// Listing/metadata source for the candidate universe.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_universe(&self, region: &str) -> Result<Vec<ListingRow>, EngineError>;
}
