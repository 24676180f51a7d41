use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::Instrument;

/// Scoring weights and market-cap penalty policy. The constants vary across
/// historical deployments, so everything here is tunable config.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Weights for the full composite over (d1, d5, d20).
    pub w_d1: f64,
    pub w_d5: f64,
    pub w_d20: f64,
    /// Weights for the coarse composite over (daily, weekly, monthly).
    pub w_daily: f64,
    pub w_weekly: f64,
    pub w_monthly: f64,
    /// Penalty steps: none below `large_cap_threshold`, `large_cap_penalty`
    /// up to `mega_cap_threshold`, `mega_cap_penalty` beyond.
    pub large_cap_threshold: f64,
    pub mega_cap_threshold: f64,
    pub large_cap_penalty: f64,
    pub mega_cap_penalty: f64,
    /// Listing rows below this cap are dropped from metadata-only ranking.
    /// Rows with no cap at all are kept.
    pub min_market_cap: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            w_d1: 0.6,
            w_d5: 0.3,
            w_d20: 0.1,
            w_daily: 1.0,
            w_weekly: 0.5,
            w_monthly: 0.25,
            large_cap_threshold: 1e9,
            mega_cap_threshold: 5e9,
            large_cap_penalty: 0.5,
            mega_cap_penalty: 1.25,
            min_market_cap: 1e8,
        }
    }
}

/// Feature-extraction windows and validity gates.
#[derive(Debug, Clone)]
pub struct FeatureConfig {
    /// Minimum non-null closes for a series to be usable.
    pub min_samples: usize,
    /// Last close at or below this is treated as degenerate.
    pub min_price: f64,
    pub sd_window: usize,
    pub volume_window: usize,
    pub spark_window: usize,
    pub spark_stride: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            min_samples: 45,
            min_price: 0.01,
            sd_window: 20,
            volume_window: 20,
            spark_window: 90,
            spark_stride: 2,
        }
    }
}

/// Requested breadth of the candidate universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniverseProfile {
    Small,
    Medium,
    Large,
}

impl std::str::FromStr for UniverseProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "small" => Ok(UniverseProfile::Small),
            "medium" => Ok(UniverseProfile::Medium),
            "large" => Ok(UniverseProfile::Large),
            other => Err(format!("unknown universe profile: {}", other)),
        }
    }
}

/// Pool size and time budget for one profile. Larger universes get more
/// workers and a longer deadline; the per-item timeout stays well under the
/// global deadline so one slow upstream call never eats the whole budget.
#[derive(Debug, Clone, Copy)]
pub struct ProfileLimits {
    pub max_pool: usize,
    pub workers: usize,
    pub global_deadline: Duration,
    pub item_timeout: Duration,
    /// Soft cap: workers stop claiming new items once this many results exist.
    pub target_results: usize,
}

#[derive(Debug, Clone)]
pub struct ProfileTable {
    pub small: ProfileLimits,
    pub medium: ProfileLimits,
    pub large: ProfileLimits,
}

impl ProfileTable {
    pub fn limits(&self, profile: UniverseProfile) -> ProfileLimits {
        match profile {
            UniverseProfile::Small => self.small,
            UniverseProfile::Medium => self.medium,
            UniverseProfile::Large => self.large,
        }
    }
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self {
            small: ProfileLimits {
                max_pool: 10,
                workers: 3,
                global_deadline: Duration::from_secs(8),
                item_timeout: Duration::from_millis(2500),
                target_results: 6,
            },
            medium: ProfileLimits {
                max_pool: 20,
                workers: 4,
                global_deadline: Duration::from_secs(12),
                item_timeout: Duration::from_millis(3000),
                target_results: 8,
            },
            large: ProfileLimits {
                max_pool: 40,
                workers: 5,
                global_deadline: Duration::from_secs(18),
                item_timeout: Duration::from_millis(3500),
                target_results: 10,
            },
        }
    }
}

/// Everything the engine needs in one place: weights, gates, time budgets,
/// the listing region and the static fallback basket.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub region: String,
    /// Series fetch window and sampling interval, Yahoo chart notation.
    pub range: String,
    pub interval: String,
    pub top_n: usize,
    /// A tier yielding fewer valid candidates than this advances the
    /// fallback coordinator.
    pub min_results: usize,
    pub scoring: ScoringConfig,
    pub features: FeatureConfig,
    pub profiles: ProfileTable,
    pub basket: Vec<Instrument>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            region: "australia".to_string(),
            range: "6mo".to_string(),
            interval: "1d".to_string(),
            top_n: 3,
            min_results: 3,
            scoring: ScoringConfig::default(),
            features: FeatureConfig::default(),
            profiles: ProfileTable::default(),
            basket: default_basket(),
        }
    }
}

impl EngineConfig {
    /// Defaults with environment overrides for the deployment-specific knobs.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(region) = std::env::var("PICKS_REGION") {
            cfg.region = region;
        }
        if let Some(n) = std::env::var("PICKS_TOP_N")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            cfg.top_n = n;
        }
        cfg
    }
}

/// Liquid ASX names used when the listing source is unreachable.
fn default_basket() -> Vec<Instrument> {
    [
        ("BHP:AU", "BHP Group"),
        ("CBA:AU", "Commonwealth Bank"),
        ("CSL:AU", "CSL"),
        ("NAB:AU", "National Australia Bank"),
        ("WBC:AU", "Westpac Banking"),
        ("WES:AU", "Wesfarmers"),
        ("MQG:AU", "Macquarie Group"),
        ("FMG:AU", "Fortescue"),
        ("WOW:AU", "Woolworths Group"),
        ("TLS:AU", "Telstra Group"),
    ]
    .iter()
    .map(|(symbol, name)| Instrument {
        symbol: symbol.to_string(),
        name: name.to_string(),
        market_cap: None,
    })
    .collect()
}
