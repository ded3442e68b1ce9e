//! Entity and store contracts implemented by persistence adapters.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use strata_domain::{ChangeKind, QueryDescription, QueryResult, Result};

/// A persisted type the cache layer can key and serialize.
///
/// `ENTITY_TYPE` is the stable name used in cache keys and invalidation
/// patterns. It must never change for a deployed type, or existing entries
/// become unreachable garbage until they expire.
pub trait CacheEntity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const ENTITY_TYPE: &'static str;

    /// Identifier used as the tail of entity keys.
    fn cache_id(&self) -> String;
}

/// Persistence port for one entity type.
///
/// Implementations sit below the caching decorator and know nothing about
/// keys or tiers. Save and delete report whether the store acknowledged a
/// change; a conflicting concurrent write surfaces as
/// [`StrataError::ConcurrencyConflict`](strata_domain::StrataError) and is
/// the decorator's cue to retry.
#[async_trait]
pub trait EntityStore<E: CacheEntity>: Send + Sync {
    /// Runs one paginated query.
    async fn query(&self, query: &QueryDescription) -> Result<QueryResult<E>>;

    /// Persists `entity`. Returns whether a change was written.
    async fn save(&self, entity: &E, change: ChangeKind) -> Result<bool>;

    /// Deletes the given entities. Returns whether a change was written.
    async fn delete(&self, entities: &[E]) -> Result<bool>;

    /// Discards session state (tracked instances, identity maps) so a
    /// retried write starts from a clean slate.
    async fn reset_session(&self);
}
