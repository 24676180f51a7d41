use picks_core::{FeatureVector, ListingRow, ScoringConfig};

/// Step penalty discouraging mega-cap names when momentum is comparable.
/// Unknown caps pay nothing.
pub fn cap_penalty(market_cap: Option<f64>, cfg: &ScoringConfig) -> f64 {
    match market_cap {
        Some(cap) if cap > cfg.mega_cap_threshold => cfg.mega_cap_penalty,
        Some(cap) if cap > cfg.large_cap_threshold => cfg.large_cap_penalty,
        _ => 0.0,
    }
}

/// Full composite over extracted features. Short-window momentum dominates,
/// tapering toward the 20-sample window; absent features contribute zero.
pub fn score_features(
    features: &FeatureVector,
    market_cap: Option<f64>,
    cfg: &ScoringConfig,
) -> f64 {
    cfg.w_d1 * features.d1.unwrap_or(0.0)
        + cfg.w_d5 * features.d5.unwrap_or(0.0)
        + cfg.w_d20 * features.d20.unwrap_or(0.0)
        - cap_penalty(market_cap, cfg)
}

/// Coarse composite over listing period changes, same linear shape as the
/// full variant. Used when no series can be fetched.
pub fn score_listing(row: &ListingRow, cfg: &ScoringConfig) -> f64 {
    cfg.w_daily * row.daily_change_pct.unwrap_or(0.0)
        + cfg.w_weekly * row.weekly_change_pct.unwrap_or(0.0)
        + cfg.w_monthly * row.monthly_change_pct.unwrap_or(0.0)
        - cap_penalty(row.market_cap, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(d1: Option<f64>, d5: Option<f64>, d20: Option<f64>) -> FeatureVector {
        FeatureVector {
            last: 10.0,
            d1,
            d5,
            d20,
            sd20: None,
            avg_volume20: None,
            spark: Vec::new(),
        }
    }

    fn row(daily: Option<f64>, weekly: Option<f64>, monthly: Option<f64>) -> ListingRow {
        ListingRow {
            symbol: "TST:AU".to_string(),
            name: "Test".to_string(),
            last: Some(10.0),
            market_cap: None,
            daily_change_pct: daily,
            weekly_change_pct: weekly,
            monthly_change_pct: monthly,
        }
    }

    #[test]
    fn cap_penalty_is_a_monotonic_step() {
        let cfg = ScoringConfig::default();
        let small = cap_penalty(Some(cfg.large_cap_threshold / 2.0), &cfg);
        let large = cap_penalty(Some(cfg.large_cap_threshold * 2.0), &cfg);
        let mega = cap_penalty(Some(cfg.mega_cap_threshold * 2.0), &cfg);
        assert_eq!(small, 0.0);
        assert!(large > small);
        assert!(mega > large);
        assert_eq!(cap_penalty(None, &cfg), 0.0);
    }

    #[test]
    fn short_window_momentum_dominates() {
        let cfg = ScoringConfig::default();
        let fast = score_features(&features(Some(5.0), Some(0.0), Some(0.0)), None, &cfg);
        let slow = score_features(&features(Some(0.0), Some(0.0), Some(5.0)), None, &cfg);
        assert!(fast > slow);
    }

    #[test]
    fn missing_features_score_as_zero() {
        let cfg = ScoringConfig::default();
        let only_d5 = score_features(&features(None, Some(2.0), None), None, &cfg);
        assert!((only_d5 - cfg.w_d5 * 2.0).abs() < 1e-9);
    }

    #[test]
    fn bigger_cap_never_scores_higher_on_equal_momentum() {
        let cfg = ScoringConfig::default();
        let f = features(Some(3.0), Some(3.0), Some(3.0));
        let small = score_features(&f, Some(5e8), &cfg);
        let large = score_features(&f, Some(2e9), &cfg);
        let mega = score_features(&f, Some(1e10), &cfg);
        assert!(small > large);
        assert!(large > mega);
    }

    #[test]
    fn coarse_score_tapers_across_periods() {
        let cfg = ScoringConfig::default();
        let daily = score_listing(&row(Some(4.0), None, None), &cfg);
        let monthly = score_listing(&row(None, None, Some(4.0)), &cfg);
        assert!(daily > monthly);
    }

    #[test]
    fn coarse_score_applies_cap_penalty() {
        let cfg = ScoringConfig::default();
        let mut r = row(Some(2.0), Some(2.0), Some(2.0));
        let unpenalized = score_listing(&r, &cfg);
        r.market_cap = Some(cfg.mega_cap_threshold * 2.0);
        assert!(score_listing(&r, &cfg) < unpenalized);
    }
}
