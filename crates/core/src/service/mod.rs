//! Services composed from the cache and store ports.

pub mod cached_store;

pub use cached_store::CachedEntityStore;
