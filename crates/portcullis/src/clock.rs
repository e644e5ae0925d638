//! Millisecond clock sources.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Milliseconds since an arbitrary fixed epoch.
pub type EpochMillis = i64;

/// Source of the current time in milliseconds.
///
/// Implementations report milliseconds since an arbitrary fixed origin;
/// the tracker only ever looks at differences between readings.
pub trait Clock: fmt::Debug + Send + Sync {
    /// Current time in milliseconds since the clock's epoch.
    fn now_ms(&self) -> EpochMillis;
}

/// Wall-clock time measured from the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> EpochMillis {
        Utc::now().timestamp_millis()
    }
}

/// Manually driven clock for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at the given instant.
    #[must_use]
    pub fn new(start: EpochMillis) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    /// Jump the clock to the given instant.
    pub fn set(&self, now: EpochMillis) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move the clock forward by the given number of milliseconds.
    pub fn advance(&self, delta: EpochMillis) {
        self.now.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> EpochMillis {
        self.now.load(Ordering::SeqCst)
    }
}
