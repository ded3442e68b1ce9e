//! Multi-tier cache machinery.
//!
//! The pieces compose bottom-up: [`ports::CacheTier`] is the uniform tier
//! contract, [`keys::KeyGenerator`] turns query descriptions into keys,
//! [`multi_tier::MultiTierCache`] stitches tiers into one logical cache,
//! and [`policy`] holds the value objects the decorator is configured with.

pub mod error;
pub mod keys;
pub mod multi_tier;
pub mod policy;
pub mod ports;
pub mod stats;

pub use error::{CacheError, CacheResult};
pub use keys::{KeyCategory, KeyGenerator};
pub use stats::StatisticsCollector;
