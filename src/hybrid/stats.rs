//! Statistics and monitoring for hybrid search.
//!
//! Aggregates are kept as running means, so memory use does not grow with
//! request volume.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Point-in-time statistics for a hybrid search service.
///
/// # Examples
///
/// ```
/// use braid::hybrid::stats::StatsTracker;
///
/// let tracker = StatsTracker::new();
/// tracker.record(10.0, 4, false, false);
/// tracker.record(20.0, 2, true, false);
///
/// let stats = tracker.snapshot();
/// assert_eq!(stats.total_searches, 2);
/// assert_eq!(stats.average_processing_time_ms, 15.0);
/// assert_eq!(stats.cache_hit_rate, 0.5);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridSearchStats {
    /// Completed searches, cache hits included.
    pub total_searches: u64,
    pub average_processing_time_ms: f64,
    pub average_result_count: f64,
    /// Fraction of searches served from cache.
    pub cache_hit_rate: f64,
    /// Searches whose keyword path failed.
    pub degraded_searches: u64,
    pub last_search_at: Option<DateTime<Utc>>,
}

/// `(avg * n + sample) / (n + 1)`
fn running_mean(average: f64, count: u64, sample: f64) -> f64 {
    let n = count as f64;
    (average * n + sample) / (n + 1.0)
}

/// Accumulates [`HybridSearchStats`] across concurrent requests.
#[derive(Debug, Default)]
pub struct StatsTracker {
    inner: Mutex<HybridSearchStats>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one completed search into the aggregates.
    pub fn record(&self, processing_time_ms: f64, result_count: usize, cache_hit: bool, degraded: bool) {
        let mut stats = self.inner.lock();
        let n = stats.total_searches;

        stats.average_processing_time_ms =
            running_mean(stats.average_processing_time_ms, n, processing_time_ms);
        stats.average_result_count =
            running_mean(stats.average_result_count, n, result_count as f64);
        stats.cache_hit_rate =
            running_mean(stats.cache_hit_rate, n, if cache_hit { 1.0 } else { 0.0 });

        stats.total_searches = n + 1;
        if degraded {
            stats.degraded_searches += 1;
        }
        stats.last_search_at = Some(Utc::now());
    }

    /// Copy of the current aggregates.
    pub fn snapshot(&self) -> HybridSearchStats {
        self.inner.lock().clone()
    }
}
