use chrono::{DateTime, Utc};
use picks_core::{EngineError, FeatureConfig, FeatureVector, HoldingSummary, SeriesPoint};
use statrs::statistics::Statistics;

/// Percentage change over `n` trailing samples: `(last - prior) / prior * 100`.
/// `None` when fewer than `n + 1` samples exist or the prior sample is zero.
pub fn pct_change(closes: &[f64], n: usize) -> Option<f64> {
    if closes.len() <= n {
        return None;
    }
    let last = closes[closes.len() - 1];
    let prior = closes[closes.len() - 1 - n];
    if prior == 0.0 {
        return None;
    }
    Some((last - prior) / prior * 100.0)
}

/// Sample (n-1) standard deviation. `None` for fewer than two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    Some(values.std_dev())
}

/// Last `window` raw samples, decimated to every `stride`-th counted back
/// from the newest sample so the most recent point always survives. Gaps in
/// the kept samples are skipped.
pub fn downsample(series: &[SeriesPoint], window: usize, stride: usize) -> Vec<f64> {
    let stride = stride.max(1);
    let start = series.len().saturating_sub(window);
    let tail = &series[start..];
    if tail.is_empty() {
        return Vec::new();
    }
    let newest = tail.len() - 1;
    tail.iter()
        .enumerate()
        .filter(|(i, _)| (newest - i) % stride == 0)
        .filter_map(|(_, p)| p.close)
        .collect()
}

/// Last non-null close plus the highest close at or after `from` (over the
/// whole series when `from` is absent). Feeds the holding-advice surface.
pub fn summarize_since(series: &[SeriesPoint], from: Option<DateTime<Utc>>) -> HoldingSummary {
    let last = series.iter().rev().find_map(|p| p.close);
    let high_since = series
        .iter()
        .filter(|p| from.map_or(true, |f| p.ts >= f))
        .filter_map(|p| p.close)
        .fold(None, |acc: Option<f64>, c| {
            Some(acc.map_or(c, |best| best.max(c)))
        });
    HoldingSummary { last, high_since }
}

/// Series -> feature vector. Rejects series that are too short or whose last
/// close is non-positive or effectively zero; everything past that gate is
/// best-effort and lands as `None` rather than failing.
pub fn extract(series: &[SeriesPoint], cfg: &FeatureConfig) -> Result<FeatureVector, EngineError> {
    let closes: Vec<f64> = series.iter().filter_map(|p| p.close).collect();

    if closes.len() < cfg.min_samples {
        return Err(EngineError::InsufficientData(format!(
            "{} usable samples, need {}",
            closes.len(),
            cfg.min_samples
        )));
    }

    let last = closes[closes.len() - 1];
    if last <= cfg.min_price {
        return Err(EngineError::InsufficientData(format!(
            "degenerate last price {}",
            last
        )));
    }

    let sd_start = closes.len().saturating_sub(cfg.sd_window);
    let sd20 = sample_std(&closes[sd_start..]);

    let volumes: Vec<f64> = series.iter().filter_map(|p| p.volume).collect();
    let vol_start = volumes.len().saturating_sub(cfg.volume_window);
    let vol_tail: &[f64] = &volumes[vol_start..];
    let avg_volume20 = if vol_tail.is_empty() {
        None
    } else {
        Some(vol_tail.mean())
    };

    Ok(FeatureVector {
        last,
        d1: pct_change(&closes, 1),
        d5: pct_change(&closes, 5),
        d20: pct_change(&closes, 20),
        sd20,
        avg_volume20,
        spark: downsample(series, cfg.spark_window, cfg.spark_stride),
    })
}
