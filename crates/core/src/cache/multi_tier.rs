//! Tier composition: one logical cache over an ordered list of tiers.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use strata_domain::CacheStatistics;
use tracing::{debug, warn};

use super::error::CacheResult;
use super::ports::{CacheTier, QueryCache};

/// TTL used when backfilling a faster tier and the origin tier cannot
/// report how long the value has left.
const DEFAULT_BACKFILL_TTL: Duration = Duration::from_secs(300);

/// Ordered tiers behaving as one cache. Fastest tier first.
///
/// Reads stop at the first hit and copy the value back into every earlier
/// tier. Writes and removals go through all tiers. A faulty tier degrades
/// reads and removals instead of failing them: those errors are logged and
/// treated as misses or zero counts. Writes are stricter: every tier is
/// still attempted and nothing rolls back, but any rejection surfaces as
/// the call's error.
pub struct MultiTierCache {
    tiers: Vec<Arc<dyn CacheTier>>,
    backfill_ttl: Duration,
}

impl MultiTierCache {
    pub fn new() -> Self {
        Self { tiers: Vec::new(), backfill_ttl: DEFAULT_BACKFILL_TTL }
    }

    /// Appends a tier. Order of calls is lookup order.
    #[must_use]
    pub fn with_tier(mut self, tier: Arc<dyn CacheTier>) -> Self {
        self.tiers.push(tier);
        self
    }

    /// Overrides the fallback TTL used for backfilled values.
    #[must_use]
    pub fn with_backfill_ttl(mut self, ttl: Duration) -> Self {
        self.backfill_ttl = ttl;
        self
    }

    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    /// First tier hit wins; the hit is copied into every earlier tier.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        for (index, tier) in self.tiers.iter().enumerate() {
            match tier.get(key).await {
                Ok(Some(value)) => {
                    if index > 0 {
                        self.backfill(key, &value, index).await;
                    }
                    return Some(value);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(tier = %tier.name(), key = %key, error = %e, "cache tier read failed, treating as miss");
                }
            }
        }
        None
    }

    /// Copies a hit from `origin` into all earlier tiers, carrying over the
    /// origin's remaining TTL so the copy never outlives the original.
    async fn backfill(&self, key: &str, value: &[u8], origin: usize) {
        let ttl = match self.tiers[origin].ttl_remaining(key).await {
            Ok(Some(remaining)) if remaining > Duration::ZERO => remaining,
            _ => self.backfill_ttl,
        };
        for tier in &self.tiers[..origin] {
            if let Err(e) = tier.set(key, value, ttl).await {
                warn!(tier = %tier.name(), key = %key, error = %e, "cache backfill failed");
            } else {
                debug!(tier = %tier.name(), key = %key, ttl_secs = ttl.as_secs(), "backfilled earlier tier");
            }
        }
    }

    /// Writes through every tier. Every tier is attempted and accepted
    /// writes are kept, but the call errs when any tier rejected the value.
    pub async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let mut last_error = None;
        for tier in &self.tiers {
            if let Err(e) = tier.set(key, value, ttl).await {
                warn!(tier = %tier.name(), key = %key, error = %e, "cache tier rejected write");
                last_error = Some(e);
            }
        }
        if let Some(error) = last_error {
            Err(error)
        } else {
            Ok(())
        }
    }

    /// Removes `key` from every tier. True when any tier held it.
    pub async fn remove(&self, key: &str) -> bool {
        let mut removed = false;
        for tier in &self.tiers {
            match tier.remove(key).await {
                Ok(hit) => removed |= hit,
                Err(e) => {
                    warn!(tier = %tier.name(), key = %key, error = %e, "cache tier removal failed");
                }
            }
        }
        removed
    }

    /// Removes pattern matches from every tier. Counts are additive across
    /// tiers, so one entry present in two tiers counts twice. A failing
    /// tier contributes zero; the call errs only when every tier failed.
    pub async fn remove_by_pattern(&self, pattern: &str) -> CacheResult<u64> {
        let mut total = 0u64;
        let mut succeeded = 0usize;
        let mut last_error = None;
        for tier in &self.tiers {
            match tier.remove_by_pattern(pattern).await {
                Ok(count) => {
                    total += count;
                    succeeded += 1;
                }
                Err(e) => {
                    warn!(tier = %tier.name(), pattern = %pattern, error = %e, "pattern invalidation failed on tier");
                    last_error = Some(e);
                }
            }
        }
        match (succeeded, last_error) {
            (0, Some(error)) => Err(error),
            _ => Ok(total),
        }
    }

    /// Clears every tier. True when every tier cleared without error.
    pub async fn clear_all(&self) -> bool {
        let mut all_cleared = true;
        for tier in &self.tiers {
            if let Err(e) = tier.clear().await {
                warn!(tier = %tier.name(), error = %e, "tier clear failed");
                all_cleared = false;
            }
        }
        all_cleared
    }

    /// Clears the tier named `name`. False when no tier carries that name.
    pub async fn clear_tier(&self, name: &str) -> bool {
        for tier in &self.tiers {
            if tier.name() == name {
                if let Err(e) = tier.clear().await {
                    warn!(tier = %name, error = %e, "tier clear failed");
                }
                return true;
            }
        }
        false
    }

    /// Per-tier statistics keyed by tier name.
    pub fn statistics(&self) -> BTreeMap<String, CacheStatistics> {
        self.tiers
            .iter()
            .map(|tier| (tier.name().to_string(), tier.statistics()))
            .collect()
    }
}

impl Default for MultiTierCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryCache for MultiTierCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        MultiTierCache::get(self, key).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        MultiTierCache::set(self, key, value, ttl).await
    }

    async fn remove(&self, key: &str) -> bool {
        MultiTierCache::remove(self, key).await
    }

    async fn remove_by_pattern(&self, pattern: &str) -> CacheResult<u64> {
        MultiTierCache::remove_by_pattern(self, pattern).await
    }

    async fn clear_all(&self) -> bool {
        MultiTierCache::clear_all(self).await
    }

    fn statistics(&self) -> BTreeMap<String, CacheStatistics> {
        MultiTierCache::statistics(self)
    }
}
