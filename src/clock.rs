//! Time source shared by every timed component.
//!
//! Dwell, calibration, cooldown and unmute deadlines are all computed from
//! `Instant`s handed out by a `Clock`. The runtime uses `SystemClock`;
//! tests use `TestClock` and step time by hand so timing is exact.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Trait abstracting the monotonic time source.
pub trait Clock: Send + Sync {
    /// Returns the current monotonic instant.
    fn now(&self) -> Instant;
}

/// Production clock backed by `Instant::now`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually stepped clock for deterministic tests.
pub struct TestClock {
    instant: Mutex<Instant>,
}

impl TestClock {
    /// Create a test clock pinned at the current real instant.
    pub fn new() -> Self {
        Self {
            instant: Mutex::new(Instant::now()),
        }
    }

    /// Advance time by the given duration.
    pub fn advance(&self, duration: Duration) {
        let mut inst = self.instant.lock().unwrap_or_else(|e| e.into_inner());
        *inst += duration;
    }

    /// Advance time by whole milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        *self.instant.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Milliseconds elapsed from `earlier` to `later`, saturating at zero.
pub fn elapsed_ms(earlier: Instant, later: Instant) -> f64 {
    later.saturating_duration_since(earlier).as_secs_f64() * 1000.0
}
