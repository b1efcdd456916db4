//! Health signals for a running [`crate::AdaptiveSampler`].
//!
//! The hot path never returns anything richer than a `bool`; everything an operator would want
//! to graph or alert on is exposed here instead, per the "observability hooks, not return
//! values" rule.

/// A point-in-time view of an [`crate::AdaptiveSampler`]'s learned state.
///
/// Obtained via [`crate::AdaptiveSampler::snapshot`]. Cheap to produce (one short mutex hold,
/// no allocation) so it is safe to sample periodically from a metrics-export task.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerSnapshot {
    /// The current window's acceptance probability.
    pub probability: f64,

    /// EWMA of adjusted observed event count per window.
    pub avg_count: f64,

    /// EWMA of adjusted observed sample count per window, or `None` before the first rotation.
    pub avg_samples: Option<f64>,

    /// Sample budget carried into the current window.
    pub samples_budget: f64,

    /// Total events offered to the current (still open) window.
    pub window_total_count: i64,

    /// Accepted samples in the current (still open) window, clamped to its budget.
    pub window_sample_count: i64,
}
