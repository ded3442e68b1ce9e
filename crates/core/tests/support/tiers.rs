//! In-memory cache tier fakes for composing real tier stacks in tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use strata_common::KeyPattern;
use strata_core::cache::StatisticsCollector;
use strata_core::{CacheError, CacheResult, CacheTier};
use strata_domain::CacheStatistics;

/// Map-backed tier. TTLs are recorded for assertions, never enforced, so
/// tests stay deterministic without a clock.
pub struct MapTier {
    name: &'static str,
    entries: Mutex<HashMap<String, (Vec<u8>, Duration)>>,
    pattern_privilege: bool,
    stats: StatisticsCollector,
}

impl MapTier {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Mutex::new(HashMap::new()),
            pattern_privilege: true,
            stats: StatisticsCollector::new(),
        }
    }

    /// Tier that rejects pattern enumeration, like a locked-down redis.
    pub fn without_pattern_privilege(name: &'static str) -> Self {
        Self { pattern_privilege: false, ..Self::new(name) }
    }

    /// TTL the last write recorded for `key`.
    pub fn recorded_ttl(&self, key: &str) -> Option<Duration> {
        self.entries.lock().unwrap().get(key).map(|(_, ttl)| *ttl)
    }

    pub fn key_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl CacheTier for MapTier {
    fn name(&self) -> &str {
        self.name
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let hit = self.entries.lock().unwrap().get(key).map(|(value, _)| value.clone());
        match hit {
            Some(value) => {
                self.stats.record_hit();
                Ok(Some(value))
            }
            None => {
                self.stats.record_miss();
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        self.entries.lock().unwrap().insert(key.to_string(), (value.to_vec(), ttl));
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<bool> {
        Ok(self.entries.lock().unwrap().remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.entries.lock().unwrap().contains_key(key))
    }

    async fn ttl_remaining(&self, key: &str) -> CacheResult<Option<Duration>> {
        Ok(self.recorded_ttl(key))
    }

    async fn refresh(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get_mut(key) {
            Some(entry) => {
                entry.1 = ttl;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_by_pattern(&self, pattern: &str) -> CacheResult<u64> {
        if !self.pattern_privilege {
            return Err(CacheError::PatternUnsupported(format!(
                "enumeration disabled on tier {}",
                self.name
            )));
        }
        let compiled = KeyPattern::compile(pattern)
            .map_err(|e| CacheError::PatternUnsupported(e.to_string()))?;
        let mut entries = self.entries.lock().unwrap();
        let doomed: Vec<String> =
            entries.keys().filter(|key| compiled.matches(key)).cloned().collect();
        for key in &doomed {
            entries.remove(key);
        }
        Ok(doomed.len() as u64)
    }

    async fn clear(&self) -> CacheResult<()> {
        self.entries.lock().unwrap().clear();
        self.stats.reset();
        Ok(())
    }

    fn statistics(&self) -> CacheStatistics {
        self.stats.snapshot(self.key_count() as u64)
    }

    async fn backend_info(&self) -> CacheResult<BTreeMap<String, String>> {
        Ok(BTreeMap::from([("backend".to_string(), "map".to_string())]))
    }
}
