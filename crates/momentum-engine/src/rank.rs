use chrono::Utc;
use picks_core::{Pick, Provenance, RankedResult, ScoredCandidate};

/// Sort by score descending (stable, so pool order breaks exact ties), keep
/// the top `n`, assign 1-based ranks, stamp time and provenance.
pub fn assemble(
    mut candidates: Vec<ScoredCandidate>,
    n: usize,
    provenance: Provenance,
) -> RankedResult {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(n);

    let picks = candidates
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            let features = c.features;
            Pick {
                symbol: c.instrument.symbol,
                name: c.instrument.name,
                entry: c.entry,
                score: c.score,
                rank: i as u32 + 1,
                d1: features.as_ref().and_then(|f| f.d1),
                d5: features.as_ref().and_then(|f| f.d5),
                d20: features.as_ref().and_then(|f| f.d20),
                sd20: features.as_ref().and_then(|f| f.sd20),
                avg_volume20: features.as_ref().and_then(|f| f.avg_volume20),
                spark: features.map(|f| f.spark).unwrap_or_default(),
            }
        })
        .collect();

    RankedResult {
        picks,
        as_of: Utc::now(),
        note: provenance.describe().to_string(),
    }
}
