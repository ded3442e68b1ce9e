//! Lock-free hit and miss accounting for cache tiers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use strata_domain::CacheStatistics;

/// Shared counters a tier updates on every lookup.
///
/// Clones share the same underlying counters, so a tier can hand a clone to
/// its eviction listener or background task without synchronization beyond
/// the atomics themselves.
#[derive(Debug, Clone, Default)]
pub struct StatisticsCollector {
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    last_updated_ms: Arc<AtomicU64>,
}

impl StatisticsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    /// Bumps the last-updated timestamp without counting a lookup. Tiers call
    /// this on writes and invalidations.
    pub fn touch(&self) {
        self.last_updated_ms
            .store(Utc::now().timestamp_millis() as u64, Ordering::Relaxed);
    }

    /// Materializes counters into a [`CacheStatistics`] value. The item count
    /// is supplied by the tier since only it knows its population.
    pub fn snapshot(&self, item_count: u64) -> CacheStatistics {
        let millis = self.last_updated_ms.load(Ordering::Relaxed);
        let last_updated = DateTime::from_timestamp_millis(millis as i64).unwrap_or_else(Utc::now);
        CacheStatistics {
            hit_count: self.hits.load(Ordering::Relaxed),
            miss_count: self.misses.load(Ordering::Relaxed),
            item_count,
            last_updated,
        }
    }

    /// Zeroes the counters. Used when a tier is cleared.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.touch();
    }
}
