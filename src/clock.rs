//! Injectable time source.
//!
//! `SamplerWindow` and `AdaptiveSampler` never call `Instant::now()` directly; they go through
//! a [`TickSource`] so tests can drive a mock clock deterministically.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

/// A monotonic tick counter plus its frequency.
///
/// Ticks are an opaque unit; only differences and `ticks_per_second` are meaningful. The
/// production implementation uses nanoseconds as the tick unit, but the trait does not assume
/// that.
pub trait TickSource: Send + Sync {
    /// Current reading of the monotonic counter, in ticks.
    fn now_ticks(&self) -> i64;

    /// Number of ticks per second, used to convert a nanosecond duration into ticks.
    fn ticks_per_second(&self) -> i64;
}

/// Converts a nanosecond duration into ticks using the given source's frequency.
///
/// Used once, at `SamplerWindow` construction, to turn `window_duration_ns` into
/// `duration_ticks`.
pub fn nanos_to_ticks(nanos: i64, ticks_per_second: i64) -> i64 {
    ((nanos as i128 * ticks_per_second as i128) / 1_000_000_000) as i64
}

/// Production [`TickSource`] backed by [`std::time::Instant`].
///
/// Ticks are nanoseconds since the clock was constructed, so `ticks_per_second` is always
/// `1_000_000_000`.
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    /// Creates a clock anchored to the current instant.
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for MonotonicClock {
    fn now_ticks(&self) -> i64 {
        self.epoch.elapsed().as_nanos() as i64
    }

    fn ticks_per_second(&self) -> i64 {
        1_000_000_000
    }
}

/// A manually-advanced [`TickSource`] for tests.
///
/// Ticks are nanoseconds, matching [`MonotonicClock`]. Threads advance it by calling
/// [`MockClock::advance`]; readers observe the new value with acquire ordering.
pub struct MockClock {
    ticks: AtomicI64,
}

impl MockClock {
    /// Creates a mock clock starting at tick `0`.
    pub fn new() -> Self {
        Self {
            ticks: AtomicI64::new(0),
        }
    }

    /// Advances the clock by `delta_nanos` ticks (nanoseconds) and returns the new reading.
    pub fn advance(&self, delta_nanos: i64) -> i64 {
        self.ticks.fetch_add(delta_nanos, Ordering::SeqCst) + delta_nanos
    }

    /// Sets the clock to an absolute tick value.
    pub fn set(&self, ticks: i64) {
        self.ticks.store(ticks, Ordering::SeqCst);
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for MockClock {
    fn now_ticks(&self) -> i64 {
        self.ticks.load(Ordering::SeqCst)
    }

    fn ticks_per_second(&self) -> i64 {
        1_000_000_000
    }
}
