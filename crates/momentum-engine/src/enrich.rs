use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use picks_core::{
    EngineConfig, EngineError, Instrument, ProfileLimits, ScoredCandidate, SeriesSource,
};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::{features, scorer};

/// Drive fetch+extract+score across the pool with a fixed set of workers
/// sharing one cursor, so a fast worker immediately helps drain the rest.
///
/// Workers stop claiming items once the global deadline passes, the soft
/// result cap is met, or the cursor is exhausted. A failing item is skipped,
/// never fatal; the per-item timeout inside `enrich_one` is what actually
/// bounds a slow upstream, the deadline is only checked between items.
pub async fn enrich_pool(
    source: Arc<dyn SeriesSource>,
    pool: Vec<Instrument>,
    limits: ProfileLimits,
    cfg: Arc<EngineConfig>,
) -> Vec<ScoredCandidate> {
    if pool.is_empty() {
        return Vec::new();
    }

    let pool = Arc::new(pool);
    let cursor = Arc::new(AtomicUsize::new(0));
    let results: Arc<Mutex<Vec<ScoredCandidate>>> = Arc::new(Mutex::new(Vec::new()));
    let deadline = Instant::now() + limits.global_deadline;

    let mut workers = JoinSet::new();
    for worker_id in 0..limits.workers.max(1) {
        let source = Arc::clone(&source);
        let pool = Arc::clone(&pool);
        let cursor = Arc::clone(&cursor);
        let results = Arc::clone(&results);
        let cfg = Arc::clone(&cfg);

        workers.spawn(async move {
            loop {
                if Instant::now() >= deadline {
                    tracing::debug!(worker_id, "global deadline reached, stopping");
                    break;
                }
                if results.lock().await.len() >= limits.target_results {
                    break;
                }
                let idx = cursor.fetch_add(1, Ordering::SeqCst);
                let Some(instrument) = pool.get(idx) else {
                    break;
                };
                match enrich_one(source.as_ref(), instrument, limits.item_timeout, &cfg).await {
                    Ok(candidate) => results.lock().await.push(candidate),
                    Err(e) => {
                        tracing::debug!(symbol = %instrument.symbol, error = %e, "skipping candidate")
                    }
                }
            }
        });
    }
    while workers.join_next().await.is_some() {}

    match Arc::try_unwrap(results) {
        Ok(mutex) => mutex.into_inner(),
        Err(arc) => arc.lock().await.clone(),
    }
}

/// One item: fetch the series under the per-item budget, extract, score.
async fn enrich_one(
    source: &dyn SeriesSource,
    instrument: &Instrument,
    item_timeout: Duration,
    cfg: &EngineConfig,
) -> Result<ScoredCandidate, EngineError> {
    let fetch = source.fetch_series(
        &instrument.chart_symbol(),
        &cfg.range,
        &cfg.interval,
        item_timeout,
    );
    // The timeout wrapper here keeps the worker bounded even if a source
    // implementation ignores its timeout argument.
    let series = match tokio::time::timeout(item_timeout, fetch).await {
        Ok(result) => result?,
        Err(_) => return Err(EngineError::Timeout),
    };

    let features = features::extract(&series, &cfg.features)?;
    let score = scorer::score_features(&features, instrument.market_cap, &cfg.scoring);

    Ok(ScoredCandidate {
        instrument: instrument.clone(),
        entry: features.last,
        score,
        features: Some(features),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use picks_core::{Series, SeriesPoint};
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex as StdMutex;

    fn uptrend_series(len: usize, daily_pct: f64) -> Series {
        let start = Utc::now() - ChronoDuration::days(len as i64);
        let mut price = 10.0;
        (0..len)
            .map(|i| {
                price *= 1.0 + daily_pct / 100.0;
                SeriesPoint {
                    ts: start + ChronoDuration::days(i as i64),
                    close: Some(price),
                    volume: Some(500_000.0),
                }
            })
            .collect()
    }

    fn instrument(i: usize) -> Instrument {
        Instrument {
            symbol: format!("S{}:AU", i),
            name: format!("Stock {}", i),
            market_cap: None,
        }
    }

    fn limits(workers: usize, target: usize) -> ProfileLimits {
        ProfileLimits {
            max_pool: 100,
            workers,
            global_deadline: Duration::from_secs(5),
            item_timeout: Duration::from_millis(100),
            target_results: target,
        }
    }

    /// Decrements the in-flight gauge even when the fetch future is dropped
    /// by the timeout wrapper.
    struct InFlightGuard<'a>(&'a AtomicUsize);

    impl Drop for InFlightGuard<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    struct FakeSource {
        delay: Duration,
        hang: HashSet<String>,
        fail: HashSet<String>,
        calls: StdMutex<HashMap<String, usize>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeSource {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                hang: HashSet::new(),
                fail: HashSet::new(),
                calls: StdMutex::new(HashMap::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SeriesSource for FakeSource {
        async fn fetch_series(
            &self,
            symbol: &str,
            _range: &str,
            _interval: &str,
            _timeout: Duration,
        ) -> Result<Series, EngineError> {
            *self
                .calls
                .lock()
                .unwrap()
                .entry(symbol.to_string())
                .or_insert(0) += 1;

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let _guard = InFlightGuard(&self.in_flight);

            if self.hang.contains(symbol) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            } else {
                tokio::time::sleep(self.delay).await;
            }

            if self.fail.contains(symbol) {
                return Err(EngineError::Upstream("synthetic failure".to_string()));
            }
            Ok(uptrend_series(90, 1.0))
        }
    }

    #[tokio::test]
    async fn in_flight_fetches_never_exceed_worker_count() {
        let source = Arc::new(FakeSource::new(Duration::from_millis(10)));
        let pool: Vec<Instrument> = (0..12).map(instrument).collect();

        enrich_pool(
            Arc::clone(&source) as Arc<dyn SeriesSource>,
            pool,
            limits(3, 100),
            Arc::new(EngineConfig::default()),
        )
        .await;

        assert!(source.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn every_index_is_processed_exactly_once() {
        let source = Arc::new(FakeSource::new(Duration::from_millis(1)));
        let pool: Vec<Instrument> = (0..10).map(instrument).collect();

        let results = enrich_pool(
            Arc::clone(&source) as Arc<dyn SeriesSource>,
            pool,
            limits(4, 100),
            Arc::new(EngineConfig::default()),
        )
        .await;

        assert_eq!(results.len(), 10);
        let calls = source.calls.lock().unwrap();
        assert_eq!(calls.len(), 10);
        assert!(calls.values().all(|&c| c == 1));
    }

    #[tokio::test]
    async fn failing_item_is_skipped_not_fatal() {
        let mut source = FakeSource::new(Duration::from_millis(1));
        source.fail.insert("S3.AX".to_string());
        let source = Arc::new(source);
        let pool: Vec<Instrument> = (0..6).map(instrument).collect();

        let results = enrich_pool(
            source as Arc<dyn SeriesSource>,
            pool,
            limits(3, 100),
            Arc::new(EngineConfig::default()),
        )
        .await;

        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|c| c.instrument.symbol != "S3:AU"));
    }

    #[tokio::test]
    async fn hanging_item_is_bounded_by_item_timeout() {
        let mut source = FakeSource::new(Duration::from_millis(1));
        source.hang.insert("S0.AX".to_string());
        let source = Arc::new(source);
        let pool: Vec<Instrument> = (0..5).map(instrument).collect();

        let started = std::time::Instant::now();
        let results = enrich_pool(
            source as Arc<dyn SeriesSource>,
            pool,
            limits(2, 100),
            Arc::new(EngineConfig::default()),
        )
        .await;

        assert_eq!(results.len(), 4);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn soft_result_cap_stops_further_claims() {
        let source = Arc::new(FakeSource::new(Duration::from_millis(5)));
        let pool: Vec<Instrument> = (0..50).map(instrument).collect();
        let lim = limits(3, 6);

        let results = enrich_pool(
            Arc::clone(&source) as Arc<dyn SeriesSource>,
            pool,
            lim,
            Arc::new(EngineConfig::default()),
        )
        .await;

        assert!(results.len() >= lim.target_results);
        // Workers already past the gate may overshoot by at most one each.
        assert!(results.len() <= lim.target_results + lim.workers);
        let calls = source.calls.lock().unwrap();
        assert!(calls.len() < 50);
    }

    #[tokio::test]
    async fn global_deadline_stops_the_batch() {
        let source = Arc::new(FakeSource::new(Duration::from_millis(30)));
        let pool: Vec<Instrument> = (0..100).map(instrument).collect();
        let lim = ProfileLimits {
            max_pool: 100,
            workers: 2,
            global_deadline: Duration::from_millis(100),
            item_timeout: Duration::from_millis(80),
            target_results: 100,
        };

        let started = std::time::Instant::now();
        enrich_pool(
            source as Arc<dyn SeriesSource>,
            pool,
            lim,
            Arc::new(EngineConfig::default()),
        )
        .await;

        // Deadline plus at most one in-flight item per worker.
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn empty_pool_returns_no_candidates() {
        let source = Arc::new(FakeSource::new(Duration::from_millis(1)));
        let results = enrich_pool(
            source as Arc<dyn SeriesSource>,
            Vec::new(),
            limits(3, 10),
            Arc::new(EngineConfig::default()),
        )
        .await;
        assert!(results.is_empty());
    }
}
