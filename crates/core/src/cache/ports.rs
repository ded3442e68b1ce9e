//! Cache traits implemented by tiers and consumed by the decorator.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use strata_domain::CacheStatistics;

use super::error::CacheResult;

/// One storage tier of the cache (in-process memory, redis, ...).
///
/// Values cross this boundary as opaque byte payloads; serialization is the
/// caller's concern. Implementations must be safe to share behind an `Arc`
/// across tasks.
#[async_trait]
pub trait CacheTier: Send + Sync {
    /// Stable tier name used in statistics maps and log lines.
    fn name(&self) -> &str;

    /// Fetches the payload stored under `key`, if present and unexpired.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Stores `value` under `key` for `ttl`.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()>;

    /// Removes `key`. Returns whether the key was present.
    async fn remove(&self, key: &str) -> CacheResult<bool>;

    /// Whether `key` is present and unexpired.
    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Remaining lifetime of `key`, or `None` when the tier cannot tell.
    async fn ttl_remaining(&self, key: &str) -> CacheResult<Option<Duration>>;

    /// Extends the lifetime of `key` to `ttl`. Returns whether the key was
    /// present to refresh.
    async fn refresh(&self, key: &str, ttl: Duration) -> CacheResult<bool>;

    /// Removes every key matching a glob pattern (`*` and `?` wildcards).
    /// Returns the number of keys removed.
    async fn remove_by_pattern(&self, pattern: &str) -> CacheResult<u64>;

    /// Drops every key in the tier.
    async fn clear(&self) -> CacheResult<()>;

    /// Snapshot of this tier's hit and miss counters.
    fn statistics(&self) -> CacheStatistics;

    /// Backend diagnostics (version, memory usage, restrictions) for
    /// operator tooling.
    async fn backend_info(&self) -> CacheResult<BTreeMap<String, String>>;
}

/// The aggregate cache the decorator talks to.
///
/// Read-side tier faults are absorbed behind this trait: a failing tier
/// degrades to a miss or a zero count rather than an error, because cached
/// reads must never take down the read path. A rejected write surfaces
/// instead, so callers learn when a value did not reach every tier.
#[async_trait]
pub trait QueryCache: Send + Sync {
    /// First tier hit wins. Tier faults count as misses.
    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Writes through every tier. Errs when any tier rejected the value;
    /// accepted writes are kept either way.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()>;

    /// Removes `key` from every tier. True when any tier held it.
    async fn remove(&self, key: &str) -> bool;

    /// Removes pattern matches from every tier and sums the counts. A
    /// failing tier contributes zero; errs only when every tier failed.
    async fn remove_by_pattern(&self, pattern: &str) -> CacheResult<u64>;

    /// Clears every tier. True when every tier cleared without error.
    async fn clear_all(&self) -> bool;

    /// Per-tier statistics keyed by tier name.
    fn statistics(&self) -> BTreeMap<String, CacheStatistics>;
}
