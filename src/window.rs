//! A single fixed-duration sampling window.
//!
//! A [`SamplerWindow`] is immutable configuration plus two atomic counters. Once constructed,
//! none of its fields are ever mutated except through the two counters; rotation discards the
//! whole instance and builds a new one rather than updating it in place.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::clock::TickSource;

/// One rotating window of a [`crate::AdaptiveSampler`].
///
/// Construction pins `p` (acceptance probability) and `B` (budget, the hard cap on accepted
/// samples) for the lifetime of the window; only `running_count` and `sample_count` change
/// after that, and only via atomic RMW from the hot path.
pub struct SamplerWindow {
    probability: f64,
    budget: i64,
    sample_all: bool,
    start_ticks: i64,
    duration_ticks: i64,
    running_count: AtomicI64,
    sample_count: AtomicI64,
}

impl SamplerWindow {
    /// Opens a new window with probability `p`, budget `budget`, and nominal duration
    /// `duration_ns`, anchored to `clock`'s current reading.
    ///
    /// `duration_ns` is converted to ticks once, here, using `clock`'s frequency; the window
    /// never re-queries the conversion.
    pub fn new(probability: f64, budget: i64, duration_ns: i64, clock: &dyn TickSource) -> Self {
        let start_ticks = clock.now_ticks();
        let duration_ticks = crate::clock::nanos_to_ticks(duration_ns, clock.ticks_per_second());
        Self {
            probability,
            budget,
            sample_all: probability >= 1.0,
            start_ticks,
            duration_ticks,
            running_count: AtomicI64::new(0),
            sample_count: AtomicI64::new(0),
        }
    }

    /// This window's acceptance probability.
    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// This window's hard cap on accepted samples.
    pub fn budget(&self) -> i64 {
        self.budget
    }

    /// Offers one event to the window's Bernoulli gate, drawing from `rng` unless the window
    /// was opened with `probability == 1.0`.
    ///
    /// Always increments `running_count`. Increments `sample_count` only when the draw passes,
    /// and returns `true` only when the post-increment `sample_count` is still within budget —
    /// so at most `budget` calls return `true` absent a race between concurrent callers landing
    /// on the same boundary value.
    pub fn should_sample(&self, rng: &dyn crate::rng::RandomSource) -> bool {
        self.running_count.fetch_add(1, Ordering::AcqRel);

        let passed = self.sample_all || rng.uniform01() < self.probability;
        if !passed {
            return false;
        }

        let n = self.sample_count.fetch_add(1, Ordering::AcqRel) + 1;
        n <= self.budget
    }

    /// True once `duration_ticks` have elapsed since the window opened.
    pub fn is_expired(&self, clock: &dyn TickSource) -> bool {
        clock.now_ticks() - self.start_ticks > self.duration_ticks
    }

    /// Ticks elapsed since the window opened, as of `clock`'s current reading.
    ///
    /// Non-positive only on a clock anomaly (a non-monotonic or unmoved clock); callers use this
    /// to detect that condition separately from `adjustment_factor`'s `1.0` fallback.
    pub fn elapsed_ticks(&self, clock: &dyn TickSource) -> i64 {
        clock.now_ticks() - self.start_ticks
    }

    /// Nominal duration divided by actual elapsed duration at the moment of the call.
    ///
    /// Callers are expected to call this only once a window has expired, to normalize its
    /// observed counts onto a common per-nominal-window basis. Falls back to `1.0` on a clock
    /// anomaly (elapsed ticks `<= 0`) rather than dividing by zero or returning a negative
    /// factor.
    pub fn adjustment_factor(&self, clock: &dyn TickSource) -> f64 {
        let elapsed = self.elapsed_ticks(clock);
        if elapsed <= 0 {
            return 1.0;
        }
        self.duration_ticks as f64 / elapsed as f64
    }

    /// Accepted sample count, clamped to `budget`.
    ///
    /// The raw atomic can briefly read above `budget` under contention (several threads can
    /// each obtain a post-increment value above the cap before any of them checks it); clamping
    /// here keeps that transient overshoot out of the EWMA math in `rotate_window`.
    pub fn sample_count(&self) -> i64 {
        self.sample_count.load(Ordering::Acquire).min(self.budget)
    }

    /// Total events offered to this window, uncapped.
    pub fn total_count(&self) -> i64 {
        self.running_count.load(Ordering::Acquire)
    }
}
