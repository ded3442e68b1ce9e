//! Cache statistics snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time counters for one cache tier.
///
/// Snapshots are cheap copies of atomically maintained counters. They are
/// used for diagnostics surfaces and tests, never for control flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatistics {
    /// Reads answered by this tier.
    pub hit_count: u64,

    /// Reads this tier could not answer.
    pub miss_count: u64,

    /// Entries currently held.
    pub item_count: u64,

    /// When any counter last changed.
    pub last_updated: DateTime<Utc>,
}

impl CacheStatistics {
    /// Fresh snapshot with all counters at zero.
    #[must_use]
    pub fn empty() -> Self {
        Self { hit_count: 0, miss_count: 0, item_count: 0, last_updated: Utc::now() }
    }

    /// Fraction of reads answered by this tier, in `[0.0, 1.0]`.
    #[must_use]
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            return 0.0;
        }
        self.hit_count as f64 / total as f64
    }
}

impl Default for CacheStatistics {
    fn default() -> Self {
        Self::empty()
    }
}
