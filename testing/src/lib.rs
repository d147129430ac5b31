//! # KIMBO Testing
//!
//! Testing utilities and helpers for the KIMBO procurement lifecycle.
//!
//! This crate provides:
//! - Deterministic `Clock` implementations
//! - A fluent Given-When-Then harness for reducers
//! - Assertion helpers for effects
//! - Test tracing setup
//!
//! ## Example
//!
//! ```ignore
//! use kimbo_testing::{ReducerTest, test_clock};
//!
//! ReducerTest::new(ProcurementReducer::new())
//!     .with_env(test_environment())
//!     .given_state(ProcurementState::loaded(request, Version::new(1)))
//!     .when_action(ProcurementAction::Transition { .. })
//!     .then_state(|state| assert!(state.last_error.is_none()))
//!     .run();
//! ```

use chrono::{DateTime, Duration, Utc};
use kimbo_core::environment::Clock;

/// Fluent reducer testing
pub mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Duration, Utc};
    use std::sync::Mutex;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use kimbo_testing::mocks::FixedClock;
    /// use kimbo_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that advances by a fixed step on every read.
    ///
    /// Useful for lifecycle walks where each stage must carry a distinct,
    /// increasing timestamp.
    #[derive(Debug)]
    pub struct SteppingClock {
        next: Mutex<DateTime<Utc>>,
        step: Duration,
    }

    impl SteppingClock {
        /// Create a clock starting at `start` and advancing by `step` per call
        #[must_use]
        pub const fn new(start: DateTime<Utc>, step: Duration) -> Self {
            Self {
                next: Mutex::new(start),
                step,
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            // A poisoned lock only means another test thread panicked mid-read;
            // the stored instant is still valid.
            let mut next = match self.next.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let current = *next;
            *next = current + self.step;
            current
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_epoch())
    }

    /// 2025-01-01 00:00:00 UTC
    #[must_use]
    pub fn test_epoch() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default()
    }
}

/// Install a compact `tracing` subscriber for tests.
///
/// Safe to call from many tests; only the first call installs the subscriber.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, SteppingClock, test_clock, test_epoch};
