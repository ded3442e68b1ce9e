//! In-process cache tier backed by moka.
//!
//! Entries carry their own TTL, enforced twice: moka's `Expiry` hooks evict
//! in the background on real time, and every read re-checks the deadline
//! against the injected [`Clock`] so answers near the deadline are
//! authoritative and tests can drive expiry with a [`MockClock`]
//! (`strata_common::time::MockClock`) instead of sleeping.
//!
//! A side index of live keys (a `DashSet`) makes glob-style pattern removal
//! possible without walking moka's internal shards.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashSet;
use moka::notification::RemovalCause;
use moka::sync::Cache;
use moka::Expiry;
use strata_common::time::{Clock, SystemClock};
use strata_common::KeyPattern;
use strata_core::cache::StatisticsCollector;
use strata_core::{CacheError, CacheResult, CacheTier};
use strata_domain::config::CacheSettings;
use strata_domain::types::CacheStatistics;
use tracing::debug;

/// One cached payload plus the bookkeeping needed to judge its freshness.
#[derive(Debug, Clone)]
struct MemoryEntry {
    payload: Arc<Vec<u8>>,
    stored_at: Instant,
    ttl: Duration,
}

impl MemoryEntry {
    fn new(payload: Vec<u8>, stored_at: Instant, ttl: Duration) -> Self {
        Self { payload: Arc::new(payload), stored_at, ttl }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) >= self.ttl
    }

    /// Time left before the deadline, `None` once it has passed.
    fn remaining(&self, now: Instant) -> Option<Duration> {
        let left = (self.stored_at + self.ttl).saturating_duration_since(now);
        (left > Duration::ZERO).then_some(left)
    }
}

/// Feeds each entry's own TTL into moka's timer wheel.
struct EntryTtlExpiry;

impl Expiry<String, MemoryEntry> for EntryTtlExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &MemoryEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &MemoryEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// First tier of the stack: a size-bounded in-process cache.
///
/// Capacity is measured in payload bytes via a weigher, so a handful of
/// large query results cannot crowd out everything else unnoticed.
pub struct MemoryCacheTier<C: Clock = SystemClock> {
    cache: Cache<String, MemoryEntry>,
    live_keys: Arc<DashSet<String>>,
    clock: C,
    stats: StatisticsCollector,
}

impl MemoryCacheTier<SystemClock> {
    /// Build a tier on the system clock, sized per `settings`.
    #[must_use]
    pub fn new(settings: &CacheSettings) -> Self {
        Self::with_clock(settings, SystemClock)
    }
}

impl<C: Clock> MemoryCacheTier<C> {
    /// Build a tier on an injected clock. Tests pass a `MockClock` here and
    /// advance it instead of sleeping.
    pub fn with_clock(settings: &CacheSettings, clock: C) -> Self {
        let live_keys: Arc<DashSet<String>> = Arc::new(DashSet::new());
        let listener_keys = Arc::clone(&live_keys);

        let cache = Cache::builder()
            .max_capacity(settings.memory_capacity_bytes())
            .weigher(|key: &String, entry: &MemoryEntry| {
                (key.len() + entry.payload.len()).min(u32::MAX as usize) as u32
            })
            .expire_after(EntryTtlExpiry)
            .eviction_listener(move |key: Arc<String>, _entry, cause| {
                // A replaced key is still live; only true departures
                // (expiry, size eviction, explicit removal) leave the index.
                if cause != RemovalCause::Replaced {
                    listener_keys.remove(key.as_ref());
                }
            })
            .build();

        Self { cache, live_keys, clock, stats: StatisticsCollector::new() }
    }
}

#[async_trait]
impl<C: Clock + 'static> CacheTier for MemoryCacheTier<C> {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        match self.cache.get(key) {
            Some(entry) if !entry.is_expired(self.clock.now()) => {
                self.stats.record_hit();
                Ok(Some(entry.payload.as_ref().clone()))
            }
            Some(_) => {
                // moka's wheel has not turned yet; the entry is gone as far
                // as callers are concerned.
                self.cache.invalidate(key);
                self.live_keys.remove(key);
                self.stats.record_miss();
                Ok(None)
            }
            None => {
                self.live_keys.remove(key);
                self.stats.record_miss();
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let entry = MemoryEntry::new(value.to_vec(), self.clock.now(), ttl);
        self.live_keys.insert(key.to_owned());
        self.cache.insert(key.to_owned(), entry);
        self.stats.touch();
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<bool> {
        self.live_keys.remove(key);
        let removed =
            self.cache.remove(key).is_some_and(|entry| !entry.is_expired(self.clock.now()));
        if removed {
            self.stats.touch();
        }
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.cache.get(key).is_some_and(|entry| !entry.is_expired(self.clock.now())))
    }

    async fn ttl_remaining(&self, key: &str) -> CacheResult<Option<Duration>> {
        Ok(self.cache.get(key).and_then(|entry| entry.remaining(self.clock.now())))
    }

    async fn refresh(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        match self.cache.get(key) {
            Some(entry) if !entry.is_expired(self.clock.now()) => {
                let renewed = MemoryEntry {
                    payload: entry.payload,
                    stored_at: self.clock.now(),
                    ttl,
                };
                self.cache.insert(key.to_owned(), renewed);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn remove_by_pattern(&self, pattern: &str) -> CacheResult<u64> {
        let matcher = KeyPattern::compile(pattern)
            .map_err(|e| CacheError::PatternUnsupported(e.to_string()))?;

        // Collect first: removing while iterating a DashSet shard deadlocks.
        let doomed: Vec<String> = self
            .live_keys
            .iter()
            .filter(|key| matcher.matches(key.as_str()))
            .map(|key| key.key().clone())
            .collect();

        let mut removed = 0u64;
        for key in &doomed {
            self.live_keys.remove(key);
            if self.cache.remove(key).is_some() {
                removed += 1;
            }
        }

        if removed > 0 {
            self.stats.touch();
        }
        debug!(pattern = %pattern, removed, "memory tier pattern removal");
        Ok(removed)
    }

    async fn clear(&self) -> CacheResult<()> {
        self.cache.invalidate_all();
        self.live_keys.clear();
        self.stats.reset();
        Ok(())
    }

    fn statistics(&self) -> CacheStatistics {
        // Flush pending eviction work so entry_count reflects reality.
        self.cache.run_pending_tasks();
        self.stats.snapshot(self.cache.entry_count())
    }

    async fn backend_info(&self) -> CacheResult<BTreeMap<String, String>> {
        self.cache.run_pending_tasks();

        let mut info = BTreeMap::new();
        info.insert("backend".to_owned(), "moka".to_owned());
        info.insert("entries".to_owned(), self.cache.entry_count().to_string());
        info.insert("weighted_size_bytes".to_owned(), self.cache.weighted_size().to_string());
        info.insert("indexed_keys".to_owned(), self.live_keys.len().to_string());
        if let Some(capacity) = self.cache.policy().max_capacity() {
            info.insert("capacity_bytes".to_owned(), capacity.to_string());
        }
        Ok(info)
    }
}
