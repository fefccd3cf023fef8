//! Time sources, the only way the engine learns what time it is.
//!
//! RULE: Nothing in the engine may read a platform clock directly.
//! Every "now" flows through a TimeSource injected at construction,
//! so tests and tooling can drive time deterministically.

use crate::types::Seconds;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// A trusted source of the current time, in seconds.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Seconds;
}

/// Wall-clock time (UTC, seconds since the Unix epoch, millisecond precision).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> Seconds {
        chrono::Utc::now().timestamp_millis() as f64 / 1000.0
    }
}

/// A settable clock. Clones share the same instant, so a test can keep
/// one handle and give another to the engine.
#[derive(Debug, Clone)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: Seconds) -> Self {
        Self { bits: Arc::new(AtomicU64::new(start.to_bits())) }
    }

    pub fn set(&self, now: Seconds) {
        self.bits.store(now.to_bits(), Ordering::SeqCst);
    }

    /// Move the clock by `delta` seconds. Negative deltas are allowed:
    /// they model a device clock being wound back.
    pub fn advance(&self, delta: Seconds) -> Seconds {
        let next = self.now() + delta;
        self.set(next);
        next
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> Seconds {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn now(&self) -> Seconds {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(1_000.0);
        let handle = clock.clone();

        handle.advance(250.5);
        assert_eq!(clock.now(), 1_250.5);

        clock.set(10.0);
        assert_eq!(handle.now(), 10.0);
    }

    #[test]
    fn system_clock_is_after_2020() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now() > 1_577_836_800.0);
    }
}
