//! # Strata Infrastructure
//!
//! Infrastructure implementations of core cache ports.
//!
//! This crate contains:
//! - The in-process memory tier (moka)
//! - The distributed redis tier
//! - Configuration loading (environment, files, defaults)
//!
//! ## Architecture
//! - Implements traits defined in `strata-core`
//! - Depends on `strata-common`, `strata-domain`, and `strata-core`
//! - Contains all "impure" code (network, environment, wall clock)

pub mod cache;
pub mod config;

// Re-export commonly used items
pub use cache::memory::MemoryCacheTier;
pub use cache::redis::RedisCacheTier;
pub use cache::build_cache;
pub use config::loader::{load, load_from_env, load_from_file};
