//! Time abstraction for testability.
//!
//! Cache expiry decisions depend on elapsed time, so every component that
//! checks a deadline takes a [`Clock`] instead of calling `Instant::now()`
//! directly. Tests inject a [`MockClock`] and advance it manually.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use strata_common::time::{Clock, MockClock, SystemClock};
//!
//! // Production code uses the system clock.
//! let clock = SystemClock;
//! let _now = clock.now();
//!
//! // Tests advance a mock clock without waiting.
//! let mock = MockClock::new();
//! let start = mock.now();
//! mock.advance(Duration::from_secs(5));
//! assert_eq!(mock.now().duration_since(start), Duration::from_secs(5));
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Trait for time operations to enable testing.
pub trait Clock: Send + Sync {
    /// Current instant (monotonic time), suitable for measuring durations.
    fn now(&self) -> Instant;

    /// Current wall clock time.
    fn system_time(&self) -> SystemTime;

    /// Milliseconds since the UNIX epoch.
    fn millis_since_epoch(&self) -> u64 {
        self.system_time().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
    }
}

/// Real system clock implementation. Use this in production code.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Mock clock for deterministic tests.
///
/// Starts at the current real time and only moves when advanced manually.
/// Clones share the same simulated elapsed time.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
    base_system_time: SystemTime,
}

impl MockClock {
    /// Create a new mock clock anchored at the current real time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
            base_system_time: SystemTime::now(),
        }
    }

    /// Simulate `duration` passing without actually waiting.
    pub fn advance(&self, duration: Duration) {
        *self.elapsed.lock() += duration;
    }

    /// Set the simulated elapsed time to an absolute value.
    pub fn set_elapsed(&self, duration: Duration) {
        *self.elapsed.lock() = duration;
    }

    /// How much time has been simulated since the clock was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + *self.elapsed.lock()
    }

    fn system_time(&self) -> SystemTime {
        self.base_system_time + *self.elapsed.lock()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the clock abstraction.

    use super::*;

    /// Validates the system clock is monotonic across consecutive reads.
    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();

        assert!(second >= first);
    }

    /// Validates `millis_since_epoch` reports a post-epoch timestamp.
    #[test]
    fn test_system_clock_millis() {
        let clock = SystemClock;
        assert!(clock.millis_since_epoch() > 0);
    }

    /// Validates `MockClock::advance` moves the monotonic reading.
    ///
    /// Assertions:
    /// - Confirms `after.duration_since(start)` equals
    ///   `Duration::from_secs(5)`.
    #[test]
    fn test_mock_clock_advance() {
        let clock = MockClock::new();
        let start = clock.now();

        clock.advance(Duration::from_secs(5));
        let after = clock.now();

        assert_eq!(after.duration_since(start), Duration::from_secs(5));
    }

    /// Validates `MockClock::set_elapsed` replaces the simulated time.
    #[test]
    fn test_mock_clock_set_elapsed() {
        let clock = MockClock::new();

        clock.set_elapsed(Duration::from_secs(10));
        assert_eq!(clock.elapsed(), Duration::from_secs(10));

        clock.set_elapsed(Duration::from_secs(20));
        assert_eq!(clock.elapsed(), Duration::from_secs(20));
    }

    /// Validates the mock wall clock tracks simulated elapsed time.
    #[test]
    fn test_mock_clock_millis_since_epoch() {
        let clock = MockClock::new();
        let before = clock.millis_since_epoch();

        clock.set_elapsed(Duration::from_millis(5000));

        assert_eq!(clock.millis_since_epoch().saturating_sub(before), 5000);
    }

    /// Validates cloned mock clocks share the same elapsed time.
    #[test]
    fn test_mock_clock_clone_shares_time() {
        let clock1 = MockClock::new();
        clock1.advance(Duration::from_secs(10));

        let clock2 = clock1.clone();
        assert_eq!(clock2.elapsed(), Duration::from_secs(10));

        clock1.advance(Duration::from_secs(5));
        assert_eq!(clock2.elapsed(), Duration::from_secs(15));
    }

    /// Validates repeated advances accumulate.
    #[test]
    fn test_mock_clock_multiple_advances() {
        let clock = MockClock::new();

        clock.advance(Duration::from_secs(1));
        clock.advance(Duration::from_secs(2));
        clock.advance(Duration::from_secs(3));

        assert_eq!(clock.elapsed(), Duration::from_secs(6));
    }
}
