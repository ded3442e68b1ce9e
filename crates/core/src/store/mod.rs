//! Persistence-side ports the cache layer decorates.

pub mod ports;

pub use ports::{CacheEntity, EntityStore};
