//! Foundation utilities shared across Strata crates.
//!
//! This crate contains:
//! - Backoff and jitter primitives for retryable operations
//! - A `Clock` abstraction for deterministic time in tests
//! - Glob-style key pattern matching
//!
//! # Architecture
//! - No dependencies on other Strata crates
//! - No I/O and no async runtime requirements

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod pattern;
pub mod retry;
pub mod time;

// Re-export commonly used items
pub use pattern::KeyPattern;
pub use retry::{BackoffStrategy, Jitter};
pub use time::{Clock, MockClock, SystemClock};
