use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One tradable instrument from the candidate pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    /// Exchange-qualified listing symbol, e.g. "BHP:AU"
    pub symbol: String,
    pub name: String,
    pub market_cap: Option<f64>,
}

/// Symbol in Yahoo chart notation: "BHP:AU" -> "BHP.AX". Symbols already
/// carrying an exchange suffix ("BHP.AX") pass through.
pub fn chart_symbol(symbol: &str) -> String {
    if symbol.contains('.') {
        return symbol.to_string();
    }
    let base = symbol.split(':').next().unwrap_or(symbol);
    format!("{}.AX", base)
}

impl Instrument {
    pub fn chart_symbol(&self) -> String {
        chart_symbol(&self.symbol)
    }
}

/// One row of the listing/metadata source, including the coarse period
/// changes used by the degraded scoring tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingRow {
    pub symbol: String,
    pub name: String,
    pub last: Option<f64>,
    pub market_cap: Option<f64>,
    pub daily_change_pct: Option<f64>,
    pub weekly_change_pct: Option<f64>,
    pub monthly_change_pct: Option<f64>,
}

impl ListingRow {
    pub fn instrument(&self) -> Instrument {
        Instrument {
            symbol: self.symbol.clone(),
            name: self.name.clone(),
            market_cap: self.market_cap,
        }
    }
}

/// One sample of a price/volume series. Gaps stay `None` and are skipped,
/// never zero-filled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub ts: DateTime<Utc>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

/// Chronological samples for one instrument, oldest first.
pub type Series = Vec<SeriesPoint>;

/// Last close and the highest close since a purchase date, for judging
/// trailing exits on an open holding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingSummary {
    pub last: Option<f64>,
    pub high_since: Option<f64>,
}

/// Derived per-instrument features. Absent features score as zero, they are
/// never fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Most recent non-null close.
    pub last: f64,
    /// Percentage change over 1/5/20 trailing samples.
    pub d1: Option<f64>,
    pub d5: Option<f64>,
    pub d20: Option<f64>,
    /// Sample standard deviation of the last 20 closes.
    pub sd20: Option<f64>,
    pub avg_volume20: Option<f64>,
    /// Decimated tail of the close series, newest point preserved.
    pub spark: Vec<f64>,
}

/// Instrument plus its score. Never mutated after scoring; `features` is
/// `None` on the metadata-only and last-resort tiers.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    pub instrument: Instrument,
    pub entry: f64,
    pub score: f64,
    pub features: Option<FeatureVector>,
}

/// Which fallback tier produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    Primary,
    StaticBasket,
    MetadataOnly,
    LastResort,
}

impl Provenance {
    pub fn describe(&self) -> &'static str {
        match self {
            Provenance::Primary => "ranked from live price series",
            Provenance::StaticBasket => {
                "listing source unavailable; ranked static basket from live series"
            }
            Provenance::MetadataOnly => {
                "series source unavailable; ranked from listing period changes"
            }
            Provenance::LastResort => {
                "no live data available; static basket with placeholder prices"
            }
        }
    }
}

/// One ranked pick as it goes over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pick {
    pub symbol: String,
    pub name: String,
    pub entry: f64,
    pub score: f64,
    /// 1-based.
    pub rank: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d5: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d20: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sd20: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_volume20: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spark: Vec<f64>,
}

/// The produced artifact: up to N picks, generation timestamp, provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedResult {
    pub picks: Vec<Pick>,
    pub as_of: DateTime<Utc>,
    pub note: String,
}
