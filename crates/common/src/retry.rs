//! Backoff and jitter primitives for retryable operations.
//!
//! Delay calculation is split from randomization so callers can pick a
//! growth curve and a jitter mode independently. Retry loops themselves
//! live with the policies that own them; this module only answers "how
//! long to wait before attempt N".

use std::time::Duration;

use rand::Rng;

/// Growth curve for delays between retry attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Same delay before every retry.
    Fixed(Duration),
    /// `initial_delay + increment * attempt`.
    Linear {
        initial_delay: Duration,
        increment: Duration,
    },
    /// `initial_delay * base^attempt`, capped at `max_delay`.
    Exponential {
        initial_delay: Duration,
        base: f64,
        max_delay: Duration,
    },
}

impl BackoffStrategy {
    /// Delay before the retry that follows failed attempt `attempt` (0-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Linear { initial_delay, increment } => {
                initial_delay.saturating_add(increment.saturating_mul(attempt))
            }
            Self::Exponential { initial_delay, base, max_delay } => {
                let scaled = initial_delay.as_millis() as f64 * base.powi(attempt as i32);
                let capped = scaled.min(max_delay.as_millis() as f64);
                Duration::from_millis(capped as u64)
            }
        }
    }
}

/// Randomization applied on top of a calculated backoff delay.
///
/// Jitter keeps concurrent retriers from synchronizing their attempts
/// against the same contended resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jitter {
    /// Use the calculated delay unchanged.
    None,
    /// Uniform over `[0, delay]`.
    Full,
    /// `delay / 2` plus uniform over the remaining half.
    Equal,
}

impl Jitter {
    /// Apply this jitter mode to a calculated delay.
    #[must_use]
    pub fn apply(&self, delay: Duration) -> Duration {
        let millis = delay.as_millis() as u64;
        match self {
            Self::None => delay,
            Self::Full => Duration::from_millis(rand::thread_rng().gen_range(0..=millis)),
            Self::Equal => {
                let half = millis / 2;
                let spread = millis - half;
                Duration::from_millis(half + rand::thread_rng().gen_range(0..=spread))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for backoff strategies and jitter modes.

    use super::*;

    /// Validates `BackoffStrategy::Fixed` returns the same delay for every
    /// attempt.
    ///
    /// Assertions:
    /// - Confirms `delay_for(0)` equals `Duration::from_millis(100)`.
    /// - Confirms `delay_for(7)` equals `Duration::from_millis(100)`.
    #[test]
    fn test_fixed_backoff_is_constant() {
        let strategy = BackoffStrategy::Fixed(Duration::from_millis(100));

        assert_eq!(strategy.delay_for(0), Duration::from_millis(100));
        assert_eq!(strategy.delay_for(7), Duration::from_millis(100));
    }

    /// Validates `BackoffStrategy::Linear` grows by the configured increment.
    ///
    /// Assertions:
    /// - Confirms `delay_for(0)` equals `Duration::from_millis(100)`.
    /// - Confirms `delay_for(1)` equals `Duration::from_millis(150)`.
    /// - Confirms `delay_for(4)` equals `Duration::from_millis(300)`.
    #[test]
    fn test_linear_backoff_grows_by_increment() {
        let strategy = BackoffStrategy::Linear {
            initial_delay: Duration::from_millis(100),
            increment: Duration::from_millis(50),
        };

        assert_eq!(strategy.delay_for(0), Duration::from_millis(100));
        assert_eq!(strategy.delay_for(1), Duration::from_millis(150));
        assert_eq!(strategy.delay_for(4), Duration::from_millis(300));
    }

    /// Validates `BackoffStrategy::Exponential` doubles per attempt and caps
    /// at `max_delay`.
    ///
    /// Assertions:
    /// - Confirms `delay_for(0)` equals `Duration::from_millis(100)`.
    /// - Confirms `delay_for(1)` equals `Duration::from_millis(200)`.
    /// - Confirms `delay_for(2)` equals `Duration::from_millis(400)`.
    /// - Confirms `delay_for(30)` equals the cap of `Duration::from_secs(10)`.
    #[test]
    fn test_exponential_backoff_doubles_and_caps() {
        let strategy = BackoffStrategy::Exponential {
            initial_delay: Duration::from_millis(100),
            base: 2.0,
            max_delay: Duration::from_secs(10),
        };

        assert_eq!(strategy.delay_for(0), Duration::from_millis(100));
        assert_eq!(strategy.delay_for(1), Duration::from_millis(200));
        assert_eq!(strategy.delay_for(2), Duration::from_millis(400));
        assert_eq!(strategy.delay_for(30), Duration::from_secs(10));
    }

    /// Validates `Jitter::None` leaves the delay untouched.
    #[test]
    fn test_jitter_none_is_identity() {
        let delay = Duration::from_millis(250);
        assert_eq!(Jitter::None.apply(delay), delay);
    }

    /// Tests full jitter stays within `[0, delay]`.
    #[test]
    fn test_jitter_full_bounded_by_delay() {
        let delay = Duration::from_millis(100);

        for _ in 0..32 {
            let jittered = Jitter::Full.apply(delay);
            assert!(jittered <= delay);
        }
    }

    /// Tests equal jitter never drops below half of the calculated delay.
    #[test]
    fn test_jitter_equal_keeps_lower_half() {
        let delay = Duration::from_millis(100);

        for _ in 0..32 {
            let jittered = Jitter::Equal.apply(delay);
            assert!(jittered >= Duration::from_millis(50));
            assert!(jittered <= delay);
        }
    }

    /// Tests jitter modes tolerate a zero delay without panicking.
    #[test]
    fn test_jitter_handles_zero_delay() {
        assert_eq!(Jitter::Full.apply(Duration::ZERO), Duration::ZERO);
        assert_eq!(Jitter::Equal.apply(Duration::ZERO), Duration::ZERO);
    }
}
