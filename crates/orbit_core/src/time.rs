//! Time sources.
//!
//! Every cooldown, effect window and spawn interval is an absolute
//! millisecond timestamp compared against "now". The scheduler reads
//! "now" from a [`Clock`]; the simulation never reads the system
//! time on its own.

use std::time::Instant;

/// Milliseconds on the session clock.
pub type Millis = u64;

/// Source of the current time in milliseconds.
pub trait Clock {
    /// Current time.
    fn now(&self) -> Millis;
}

/// Real wall-clock time, measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Start a clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Millis {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Explicitly advanced clock for tests, replays and batch runs.
///
/// Keeps fractional milliseconds so that advancing by `1000 / 60`
/// sixty times lands exactly on one second.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ManualClock {
    now: f64,
}

impl ManualClock {
    /// Clock starting at `start` milliseconds.
    #[must_use]
    pub fn starting_at(start: Millis) -> Self {
        Self { now: start as f64 }
    }

    /// Move the clock forward.
    pub fn advance(&mut self, ms: f64) {
        if ms > 0.0 {
            self.now += ms;
        }
    }

    /// Jump to an absolute time. Going backwards is ignored.
    pub fn set(&mut self, now: Millis) {
        self.now = self.now.max(now as f64);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Millis {
        // tolerate float drift from summing repeating fractions
        (self.now + 1e-6).floor() as Millis
    }
}
