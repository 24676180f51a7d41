use picks_core::{EngineConfig, Instrument, ListingRow, ProfileLimits, UniverseProfile};

/// Candidate pool plus the time/concurrency budget it will be worked under.
#[derive(Debug, Clone)]
pub struct PoolPlan {
    pub instruments: Vec<Instrument>,
    pub limits: ProfileLimits,
}

/// Pool from live listing rows, order preserved, capped to the profile.
pub fn plan_from_listing(
    rows: &[ListingRow],
    profile: UniverseProfile,
    cfg: &EngineConfig,
) -> PoolPlan {
    let limits = cfg.profiles.limits(profile);
    let instruments = rows
        .iter()
        .take(limits.max_pool)
        .map(|r| r.instrument())
        .collect();
    PoolPlan { instruments, limits }
}

/// Pool from the configured static basket, for when the listing source is
/// unreachable.
pub fn plan_from_basket(profile: UniverseProfile, cfg: &EngineConfig) -> PoolPlan {
    let limits = cfg.profiles.limits(profile);
    let instruments = cfg
        .basket
        .iter()
        .take(limits.max_pool)
        .cloned()
        .collect();
    PoolPlan { instruments, limits }
}
