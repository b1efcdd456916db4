//! Injectable uniform random source.
//!
//! `SamplerWindow::should_sample` draws one uniform `[0, 1)` value per call when its
//! probability is less than `1.0`. Going through a trait instead of calling `rand::thread_rng()`
//! directly lets tests replace the draw with a deterministic sequence.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

/// A source of uniformly-distributed `f64` values in `[0, 1)`.
pub trait RandomSource: Send + Sync {
    /// Draws one value in `[0, 1)`.
    fn uniform01(&self) -> f64;
}

/// Production [`RandomSource`] backed by `rand`'s per-thread generator.
#[derive(Default)]
pub struct ThreadRngSource;

impl RandomSource for ThreadRngSource {
    fn uniform01(&self) -> f64 {
        rand::thread_rng().gen_range(0.0..1.0)
    }
}

/// A deterministic [`RandomSource`] for tests: cycles through a fixed sequence of values.
///
/// Threads calling concurrently each advance a shared cursor, so the sequence is consumed
/// exactly once in total, not once per thread.
pub struct FixedSequenceRng {
    sequence: Vec<f64>,
    cursor: AtomicU64,
}

impl FixedSequenceRng {
    /// Creates a source that replays `sequence` indefinitely.
    ///
    /// # Panics
    /// Panics if `sequence` is empty.
    pub fn new(sequence: Vec<f64>) -> Self {
        assert!(!sequence.is_empty(), "FixedSequenceRng needs at least one value");
        Self {
            sequence,
            cursor: AtomicU64::new(0),
        }
    }

    /// Convenience constructor that always returns `value`.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

impl RandomSource for FixedSequenceRng {
    fn uniform01(&self) -> f64 {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) as usize;
        self.sequence[i % self.sequence.len()]
    }
}

/// A reproducible xorshift generator for scenario tests that want real (but seeded)
/// pseudo-randomness without pulling in the full `rand` thread-local state.
///
/// Boxed as a `Box<dyn RandomSource>` and shared across threads the same way `FixedSequenceRng`
/// is, so the state lives behind an `AtomicU64` and advances via a compare-exchange loop rather
/// than a `Cell` — a plain `Cell` would race under concurrent `should_sample()` callers, which is
/// exactly the scenario `RandomSource: Send + Sync` exists to support.
pub struct SeededRng {
    state: AtomicU64,
}

impl SeededRng {
    /// Creates a generator seeded with `seed` (must be non-zero).
    pub fn new(seed: u64) -> Self {
        Self {
            state: AtomicU64::new(if seed == 0 { 0x9E3779B97F4A7C15 } else { seed }),
        }
    }

    fn next_u64(&self) -> u64 {
        let mut current = self.state.load(Ordering::Relaxed);
        loop {
            let mut x = current;
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            match self
                .state
                .compare_exchange_weak(current, x, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return x,
                Err(actual) => current = actual,
            }
        }
    }
}

impl RandomSource for SeededRng {
    fn uniform01(&self) -> f64 {
        // Top 53 bits give a uniform double in [0, 1) via the standard ldexp trick.
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_sequence_cycles() {
        let rng = FixedSequenceRng::new(vec![0.1, 0.2, 0.3]);
        let draws: Vec<f64> = (0..7).map(|_| rng.uniform01()).collect();
        assert_eq!(draws, vec![0.1, 0.2, 0.3, 0.1, 0.2, 0.3, 0.1]);
    }

    #[test]
    fn constant_always_returns_same_value() {
        let rng = FixedSequenceRng::constant(0.5);
        for _ in 0..5 {
            assert_eq!(rng.uniform01(), 0.5);
        }
    }

    #[test]
    fn seeded_rng_stays_within_unit_interval() {
        let rng = SeededRng::new(42);
        for _ in 0..10_000 {
            let v = rng.uniform01();
            assert!((0.0..1.0).contains(&v), "draw {v} outside [0, 1)");
        }
    }
}
