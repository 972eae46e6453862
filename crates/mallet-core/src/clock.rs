//! Timer clocks for bookkeeping.
//!
//! These are separate from the audio clock ([`AudioContext::current_time`]).
//! Expiry of finished notes runs on a [`Clock`]; gain ramps and source
//! stops run on the audio clock. The two are never substituted for each
//! other.
//!
//! [`AudioContext::current_time`]: crate::AudioContext::current_time

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use atomic_float::AtomicF64;

/// Source of "now" in seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Monotonic wall clock, zeroed at construction.
#[derive(Debug, Clone)]
pub struct WallClock {
    origin: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    time: Arc<AtomicF64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move forward by `seconds`. Negative or non-finite steps are ignored.
    pub fn advance(&self, seconds: f64) {
        if seconds.is_finite() && seconds > 0.0 {
            self.time.fetch_add(seconds, Ordering::AcqRel);
        }
    }

    /// Jump to `seconds`, but never backwards.
    pub fn set(&self, seconds: f64) {
        if seconds.is_finite() {
            self.time.fetch_max(seconds, Ordering::AcqRel);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.time.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(1.5);
        assert_relative_eq!(other.now(), 1.5);
    }

    #[test]
    fn test_manual_clock_never_goes_back() {
        let clock = ManualClock::new();
        clock.set(3.0);
        clock.set(1.0);
        clock.advance(-2.0);
        clock.advance(f64::NAN);
        assert_relative_eq!(clock.now(), 3.0);
    }

    #[test]
    fn test_wall_clock_monotonic() {
        let clock = WallClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
