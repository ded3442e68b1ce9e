//! # Strata Domain
//!
//! Business domain types and models for Strata.
//!
//! This crate contains:
//! - Query descriptions and the typed filter tree they carry
//! - Query result and change-kind types
//! - Cache statistics snapshots and cache settings
//! - Domain error types and Result definitions
//!
//! ## Architecture
//! - No dependencies on other Strata crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
