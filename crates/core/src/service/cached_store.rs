//! Caching decorator around an [`EntityStore`].
//!
//! The decorator is transparent: it implements the same port it wraps, so
//! callers cannot tell a cached store from a bare one. Reads go cache-first
//! with read-through population; writes run a bounded retry loop for
//! concurrency conflicts and synchronously invalidate the entity type's key
//! space before returning, which is what gives readers read-your-writes.
//!
//! Cache faults never change the outcome of a business operation. Every
//! cache error on these paths is logged and absorbed.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use strata_domain::{
    CacheSettings, CacheStatistics, ChangeKind, QueryDescription, QueryResult, Result, StrataError,
};
use tracing::{debug, error, info, warn};

use crate::cache::keys::KeyGenerator;
use crate::cache::policy::{InvalidationPolicy, WriteRetryPolicy};
use crate::cache::ports::QueryCache;
use crate::store::ports::{CacheEntity, EntityStore};

/// Cache-aside decorator for one entity type.
pub struct CachedEntityStore<E: CacheEntity> {
    store: Arc<dyn EntityStore<E>>,
    cache: Arc<dyn QueryCache>,
    keys: KeyGenerator,
    invalidation: InvalidationPolicy,
    retry: WriteRetryPolicy,
}

impl<E: CacheEntity> CachedEntityStore<E> {
    pub fn new(
        store: Arc<dyn EntityStore<E>>,
        cache: Arc<dyn QueryCache>,
        settings: &CacheSettings,
        invalidation: InvalidationPolicy,
        retry: WriteRetryPolicy,
    ) -> Self {
        Self { store, cache, keys: KeyGenerator::new(settings), invalidation, retry }
    }

    /// Variant with minimal invalidation and quiet diagnostics.
    pub fn lightweight(
        store: Arc<dyn EntityStore<E>>,
        cache: Arc<dyn QueryCache>,
        settings: &CacheSettings,
    ) -> Self {
        Self::new(store, cache, settings, InvalidationPolicy::lightweight(), WriteRetryPolicy::default())
    }

    /// Variant with per-category parallel invalidation and timing logs.
    pub fn enhanced(
        store: Arc<dyn EntityStore<E>>,
        cache: Arc<dyn QueryCache>,
        settings: &CacheSettings,
    ) -> Self {
        Self::new(store, cache, settings, InvalidationPolicy::enhanced(), WriteRetryPolicy::default())
    }

    /// Cache-first read. On a miss the store result is cached unless empty,
    /// with the TTL heuristic from the key generator.
    pub async fn query(&self, query: &QueryDescription) -> Result<QueryResult<E>> {
        let key = self.keys.query_key(E::ENTITY_TYPE, query);

        if let Some(bytes) = self.cache.get(&key).await {
            match serde_json::from_slice::<QueryResult<E>>(&bytes) {
                Ok(result) => {
                    debug!(entity_type = E::ENTITY_TYPE, key = %key, "query served from cache");
                    return Ok(result);
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "cached payload undecodable, evicting");
                    self.cache.remove(&key).await;
                }
            }
        }

        let result = self.store.query(query).await?;

        if !result.is_empty() {
            match serde_json::to_vec(&result) {
                Ok(bytes) => {
                    let ttl = self.keys.query_ttl(query);
                    if let Err(e) = self.cache.set(&key, &bytes, ttl).await {
                        warn!(key = %key, error = %e, "failed to cache query result");
                    }
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "query result not serializable, skipping cache");
                }
            }
        }

        Ok(result)
    }

    /// Persists `entity`, retrying concurrency conflicts up to the policy
    /// bound. Exhausted conflicts propagate to the caller. The entity
    /// type's key space is invalidated before a success returns.
    pub async fn save(&self, entity: &E, change: ChangeKind) -> Result<bool> {
        let mut attempt = 1u32;
        loop {
            match self.store.save(entity, change).await {
                Ok(outcome) => {
                    self.invalidate_entity(false).await;
                    return Ok(outcome);
                }
                Err(e) if e.is_concurrency_conflict() && attempt < self.retry.max_attempts => {
                    self.prepare_retry(attempt, &e).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_concurrency_conflict() {
                        error!(
                            entity_type = E::ENTITY_TYPE,
                            attempts = attempt,
                            error = %e,
                            "save abandoned after repeated conflicts"
                        );
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Deletes `entities` with the same bounded retry. A delete is
    /// idempotent, so a target that vanished or keeps conflicting counts as
    /// already deleted. An empty slice is a no-op.
    pub async fn delete(&self, entities: &[E]) -> Result<bool> {
        if entities.is_empty() {
            return Ok(false);
        }
        let mut attempt = 1u32;
        loop {
            match self.store.delete(entities).await {
                Ok(outcome) => {
                    self.invalidate_entity(false).await;
                    return Ok(outcome);
                }
                Err(e) if e.is_not_found() => {
                    debug!(entity_type = E::ENTITY_TYPE, "delete target already gone");
                    self.invalidate_entity(false).await;
                    return Ok(true);
                }
                Err(e) if e.is_concurrency_conflict() => {
                    if attempt < self.retry.max_attempts {
                        self.prepare_retry(attempt, &e).await;
                        attempt += 1;
                    } else {
                        warn!(
                            entity_type = E::ENTITY_TYPE,
                            attempts = attempt,
                            error = %e,
                            "delete conflicts exhausted retries, treating as already deleted"
                        );
                        self.invalidate_entity(false).await;
                        return Ok(true);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Drops every cached entry for this entity type. Returns the number of
    /// entries removed across tiers.
    pub async fn invalidate(&self) -> u64 {
        self.invalidate_entity(false).await
    }

    /// Per-tier cache statistics.
    pub fn cache_statistics(&self) -> BTreeMap<String, CacheStatistics> {
        self.cache.statistics()
    }

    /// Clears every tier. True when all tiers cleared without error.
    pub async fn clear_cache(&self) -> bool {
        self.cache.clear_all().await
    }

    async fn prepare_retry(&self, attempt: u32, error: &StrataError) {
        warn!(
            entity_type = E::ENTITY_TYPE,
            attempt,
            error = %error,
            "write conflict, resetting session and retrying"
        );
        self.store.reset_session().await;
        self.invalidate_entity(true).await;
        tokio::time::sleep(self.retry.delay_for(attempt)).await;
    }

    /// Runs the policy's invalidation patterns, in parallel when configured.
    /// Returns the additive removal count across patterns and tiers. A
    /// policy that records timings also gets per-pattern counts in the log.
    async fn invalidate_entity(&self, during_retry: bool) -> u64 {
        let patterns = self.invalidation.patterns(&self.keys, E::ENTITY_TYPE);
        let started = Instant::now();

        let results = if self.invalidation.parallel && patterns.len() > 1 {
            futures::future::join_all(
                patterns.iter().map(|pattern| self.cache.remove_by_pattern(pattern)),
            )
            .await
        } else {
            let mut results = Vec::with_capacity(patterns.len());
            for pattern in &patterns {
                results.push(self.cache.remove_by_pattern(pattern).await);
            }
            results
        };

        let mut removed = 0u64;
        for (pattern, result) in patterns.iter().zip(results) {
            match result {
                Ok(count) => {
                    if self.invalidation.record_timings {
                        debug!(
                            entity_type = E::ENTITY_TYPE,
                            pattern = %pattern,
                            removed = count,
                            "invalidated pattern"
                        );
                    }
                    removed += count;
                }
                Err(e) if during_retry && self.invalidation.escalate_retry_faults => {
                    error!(pattern = %pattern, error = %e, "invalidation failed during write retry");
                }
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "invalidation failed");
                }
            }
        }

        if self.invalidation.record_timings {
            info!(
                entity_type = E::ENTITY_TYPE,
                patterns = patterns.len(),
                removed,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "cache invalidation complete"
            );
        }

        removed
    }
}

/// Transparent decoration: a cached store is itself an [`EntityStore`].
#[async_trait]
impl<E: CacheEntity> EntityStore<E> for CachedEntityStore<E> {
    async fn query(&self, query: &QueryDescription) -> Result<QueryResult<E>> {
        CachedEntityStore::query(self, query).await
    }

    async fn save(&self, entity: &E, change: ChangeKind) -> Result<bool> {
        CachedEntityStore::save(self, entity, change).await
    }

    async fn delete(&self, entities: &[E]) -> Result<bool> {
        CachedEntityStore::delete(self, entities).await
    }

    async fn reset_session(&self) {
        self.store.reset_session().await;
    }
}
