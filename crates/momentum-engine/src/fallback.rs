use std::sync::Arc;

use picks_core::{
    EngineConfig, EngineError, ListingRow, ListingSource, Provenance, RankedResult,
    ScoredCandidate, SeriesSource, UniverseProfile,
};

use crate::{enrich, rank, scorer, universe};

/// Neutral entry price for last-resort picks, where no live quote exists.
const PLACEHOLDER_ENTRY: f64 = 1.0;

/// Runs the fallback tiers in escalating order of degradation and always
/// hands back a well-formed result while any source is reachable:
///
/// 1. live listing pool, scored from fetched series
/// 2. static basket pool, scored from fetched series
/// 3. listing rows scored from their coarse period changes
/// 4. static basket with placeholder prices and zero scores
pub struct PickEngine {
    series: Arc<dyn SeriesSource>,
    listing: Arc<dyn ListingSource>,
    cfg: Arc<EngineConfig>,
}

impl PickEngine {
    pub fn new(
        series: Arc<dyn SeriesSource>,
        listing: Arc<dyn ListingSource>,
        cfg: EngineConfig,
    ) -> Self {
        Self {
            series,
            listing,
            cfg: Arc::new(cfg),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Produce the top `n` picks for the requested universe breadth.
    pub async fn top_picks(
        &self,
        profile: UniverseProfile,
        n: usize,
    ) -> Result<RankedResult, EngineError> {
        let rows = match self.listing.fetch_universe(&self.cfg.region).await {
            Ok(rows) if !rows.is_empty() => Some(rows),
            Ok(_) => {
                tracing::warn!("listing source returned no rows");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "listing source unreachable");
                None
            }
        };

        let (plan, provenance) = match &rows {
            Some(rows) => (
                universe::plan_from_listing(rows, profile, &self.cfg),
                Provenance::Primary,
            ),
            None => (
                universe::plan_from_basket(profile, &self.cfg),
                Provenance::StaticBasket,
            ),
        };

        let mut live = Vec::new();
        if !plan.instruments.is_empty() {
            let required = self.cfg.min_results.min(plan.instruments.len());
            live = enrich::enrich_pool(
                Arc::clone(&self.series),
                plan.instruments,
                plan.limits,
                Arc::clone(&self.cfg),
            )
            .await;
            if live.len() >= required {
                return Ok(rank::assemble(live, n, provenance));
            }
            tracing::warn!(
                got = live.len(),
                required,
                "enrichment under-filled, degrading"
            );
        }

        // Coarse period changes came along with the listing rows; rank from
        // those when they cover more ground than the live leftovers.
        if let Some(rows) = &rows {
            let coarse = self.metadata_candidates(rows);
            if coarse.len() > live.len() {
                tracing::info!(candidates = coarse.len(), "ranking from listing metadata");
                return Ok(rank::assemble(coarse, n, Provenance::MetadataOnly));
            }
        }

        // A short live result still beats placeholders.
        if !live.is_empty() {
            return Ok(rank::assemble(live, n, provenance));
        }

        if self.cfg.basket.is_empty() {
            return Err(EngineError::NoPool);
        }

        tracing::warn!("no live data from any source, returning static placeholders");
        let last_resort: Vec<ScoredCandidate> = self
            .cfg
            .basket
            .iter()
            .take(self.cfg.min_results)
            .map(|inst| ScoredCandidate {
                instrument: inst.clone(),
                entry: PLACEHOLDER_ENTRY,
                score: 0.0,
                features: None,
            })
            .collect();
        Ok(rank::assemble(last_resort, n, Provenance::LastResort))
    }

    /// Rows usable for degraded scoring: positive last price, and either no
    /// cap on record or one above the configured floor.
    fn metadata_candidates(&self, rows: &[ListingRow]) -> Vec<ScoredCandidate> {
        rows.iter()
            .filter_map(|row| {
                let entry = row.last.filter(|l| *l > 0.0)?;
                if let Some(cap) = row.market_cap {
                    if cap < self.cfg.scoring.min_market_cap {
                        return None;
                    }
                }
                Some(ScoredCandidate {
                    instrument: row.instrument(),
                    entry,
                    score: scorer::score_listing(row, &self.cfg.scoring),
                    features: None,
                })
            })
            .collect()
    }
}
