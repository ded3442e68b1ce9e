//! Cache tier adapters.
//!
//! Two [`CacheTier`](strata_core::CacheTier) implementations live here: an
//! in-process [`memory`] tier backed by moka and a networked [`redis`] tier.
//! [`build_cache`] composes them into the [`MultiTierCache`] the rest of the
//! application consumes.

pub mod memory;
pub mod redis;

use std::sync::Arc;

use strata_core::MultiTierCache;
use strata_domain::config::CacheSettings;
use tracing::info;

use self::memory::MemoryCacheTier;
use self::redis::RedisCacheTier;

/// Assemble the tier stack described by `settings`.
///
/// The memory tier is always present. The redis tier is appended behind it
/// only when `enable_distributed_cache` is set; a redis instance that cannot
/// be reached at startup still yields a tier, just one that quietly misses,
/// so composition never fails.
pub async fn build_cache(settings: &CacheSettings) -> MultiTierCache {
    let mut cache = MultiTierCache::new().with_tier(Arc::new(MemoryCacheTier::new(settings)));

    if settings.enable_distributed_cache {
        cache = cache.with_tier(Arc::new(RedisCacheTier::connect(settings).await));
    }

    info!(tiers = cache.tier_count(), "cache tier stack assembled");
    cache
}
