//! Strategy objects configuring the cached store decorator.
//!
//! Both policies are plain value objects so the two decorator variants are
//! data, not subclasses: `lightweight()` and `enhanced()` differ only in the
//! policy values they carry.

use std::time::Duration;

use strata_common::{BackoffStrategy, Jitter};

use super::keys::{KeyCategory, KeyGenerator};

/// How much of the key space a write invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationBreadth {
    /// One wildcard pattern spanning every category of the entity type.
    Minimal,
    /// One pattern per category, enabling per-category counts and timings.
    Broad,
}

/// Invalidation behavior of one decorator variant.
#[derive(Debug, Clone)]
pub struct InvalidationPolicy {
    pub breadth: InvalidationBreadth,
    /// Issue category patterns concurrently instead of sequentially.
    pub parallel: bool,
    /// Emit an info line with elapsed time and removal counts.
    pub record_timings: bool,
    /// Log invalidation faults during a write retry at error level.
    pub escalate_retry_faults: bool,
}

impl InvalidationPolicy {
    /// Policy of the lightweight variant: one pattern, quiet logging.
    pub fn lightweight() -> Self {
        Self {
            breadth: InvalidationBreadth::Minimal,
            parallel: false,
            record_timings: false,
            escalate_retry_faults: false,
        }
    }

    /// Policy of the enhanced variant: per-category patterns issued in
    /// parallel with timing diagnostics.
    pub fn enhanced() -> Self {
        Self {
            breadth: InvalidationBreadth::Broad,
            parallel: true,
            record_timings: true,
            escalate_retry_faults: true,
        }
    }

    /// The glob patterns a write against `entity_type` must invalidate.
    /// Both breadths cover the same key space.
    pub fn patterns(&self, keys: &KeyGenerator, entity_type: &str) -> Vec<String> {
        match self.breadth {
            InvalidationBreadth::Minimal => vec![keys.invalidation_pattern(entity_type)],
            InvalidationBreadth::Broad => KeyCategory::ALL
                .iter()
                .map(|category| keys.category_pattern(*category, entity_type))
                .collect(),
        }
    }
}

/// Retry behavior for writes that hit a concurrency conflict.
#[derive(Debug, Clone)]
pub struct WriteRetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
    pub jitter: Jitter,
}

impl Default for WriteRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffStrategy::Exponential {
                initial_delay: Duration::from_millis(100),
                base: 2.0,
                max_delay: Duration::from_secs(5),
            },
            jitter: Jitter::Equal,
        }
    }
}

impl WriteRetryPolicy {
    /// Delay to sleep after failed attempt `attempt` (1-based) before the
    /// next one.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.jitter.apply(self.backoff.delay_for(attempt.saturating_sub(1)))
    }
}
