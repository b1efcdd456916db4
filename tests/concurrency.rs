//! Multi-threaded hammering of a single `AdaptiveSampler`: checks invariant 1 (the window's
//! accepted-sample bound, widened by the thread count `k`) holds under real concurrent racing,
//! and that `should_sample()` never panics or deadlocks.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use adaptive_sampler::clock::MonotonicClock;
use adaptive_sampler::rng::FixedSequenceRng;
use adaptive_sampler::{AdaptiveSampler, SamplerConfig};

const THREADS: usize = 8;
const CALLS_PER_THREAD: usize = 2_000;

/// Invariant 1: a single window never admits more than `budget + k` samples, where `k` is the
/// number of threads concurrently racing `should_sample()`.
///
/// Construction parameters are chosen so the window never expires during the run (the clock is
/// never advanced), so every call lands in the same window and `budget` is exactly the window's
/// initial budget: `T * (1 + L_b)`.
#[test]
fn concurrent_callers_stay_within_budget_plus_thread_count() {
    let window_duration_ms: u64 = 60_000; // long enough that the test cannot outrun it on any CI box.
    let target: u64 = 50;
    let window_lookback: u64 = 10;
    let budget_lookback: u64 = 25;
    let budget = target as i64 * (1 + budget_lookback as i64);

    let config =
        SamplerConfig::new(window_duration_ms, target, window_lookback, budget_lookback).unwrap();
    // probability 0.1 and a constant draw of 0.0 means every offered event passes the Bernoulli
    // gate; the budget is the only thing limiting acceptance.
    let sampler = Arc::new(
        AdaptiveSampler::with_clock_and_rng(
            config,
            Box::new(MonotonicClock::new()),
            Box::new(FixedSequenceRng::constant(0.0)),
        )
        .unwrap(),
    );

    let accepted = Arc::new(AtomicI64::new(0));
    let (done_tx, done_rx) = mpsc::channel();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let sampler = sampler.clone();
            let accepted = accepted.clone();
            thread::spawn(move || {
                for _ in 0..CALLS_PER_THREAD {
                    if sampler.should_sample() {
                        accepted.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    // Join on a background thread so a hang shows up as a timed-out test rather than blocking
    // the suite forever.
    thread::spawn(move || {
        for h in handles {
            h.join().expect("worker thread panicked");
        }
        let _ = done_tx.send(());
    });
    done_rx
        .recv_timeout(Duration::from_secs(30))
        .expect("workers did not finish within the timeout; suspect a deadlock");

    let accepted = accepted.load(Ordering::Relaxed);
    assert!(
        accepted <= budget + THREADS as i64,
        "accepted {accepted} exceeds budget {budget} + thread count {THREADS}"
    );
    let snap = sampler.snapshot();
    assert_eq!(snap.window_sample_count, accepted.min(budget));
}
