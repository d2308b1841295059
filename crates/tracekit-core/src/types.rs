//! Shared primitive types for the tracekit SDK
//!
//! Contains the SDK identity constants and the [`TimeSource`] abstraction used
//! throughout the pipeline so that session durations, timestamps, and backoff
//! logic can be driven by a controllable clock in tests.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

// ----------------------------------------------------------------------------
// SDK Identity
// ----------------------------------------------------------------------------

/// SDK name reported in snapshots and the `User-Agent` header.
pub const SDK_NAME: &str = "tracekit-rs";

/// SDK version reported in every context snapshot and upload payload.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

// ----------------------------------------------------------------------------
// Time Source Trait
// ----------------------------------------------------------------------------

/// Trait for providing timestamps to the pipeline.
///
/// Session durations, screen-view durations, and event timestamps all flow
/// through this trait so tests can substitute a manual clock.
pub trait TimeSource: Send + Sync {
    /// Get the current timestamp.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation of [`TimeSource`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl SystemTimeSource {
    pub fn new() -> Self {
        Self
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced [`TimeSource`] for tests.
///
/// Clones share the same underlying instant, so a handle kept by a test can
/// advance the clock seen by a tracker that owns another clone.
#[derive(Debug, Clone)]
pub struct ManualTimeSource {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualTimeSource {
    /// Create a manual time source starting at the given instant.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("time source lock poisoned");
        *now += by;
    }

    /// Set the clock to an absolute instant.
    pub fn set(&self, to: DateTime<Utc>) {
        let mut now = self.now.lock().expect("time source lock poisoned");
        *now = to;
    }
}

impl Default for ManualTimeSource {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("time source lock poisoned")
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_time_source_advances() {
        let start = Utc::now();
        let clock = ManualTimeSource::new(start);
        let shared = clock.clone();

        assert_eq!(clock.now(), start);

        shared.advance(Duration::seconds(5));
        assert_eq!(clock.now(), start + Duration::seconds(5));
    }

    #[test]
    fn test_system_time_source_is_monotonic_enough() {
        let clock = SystemTimeSource::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
