//! # Strata Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Cache tier ports and the multi-tier orchestrator
//! - Deterministic cache key generation
//! - Invalidation and write-retry policies
//! - The caching decorator around the entity store port
//!
//! ## Architecture Principles
//! - Only depends on `strata-common` and `strata-domain`
//! - No network, storage, or platform code
//! - All external effects via traits
//! - Pure, testable business logic

pub mod cache;
pub mod service;
pub mod store;

// Re-export specific items to avoid ambiguity
pub use cache::multi_tier::MultiTierCache;
pub use cache::policy::{InvalidationBreadth, InvalidationPolicy, WriteRetryPolicy};
pub use cache::ports::{CacheTier, QueryCache};
pub use cache::{CacheError, CacheResult, KeyCategory, KeyGenerator};
pub use service::CachedEntityStore;
pub use store::ports::{CacheEntity, EntityStore};
