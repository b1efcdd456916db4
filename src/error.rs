//! Error types surfaced by the sampler's construction and configuration paths.
//!
//! The hot path (`AdaptiveSampler::should_sample`) never returns a `Result`; the only errors
//! a caller can observe are raised at construction time.

use thiserror::Error;

/// Errors raised while configuring or constructing an [`AdaptiveSampler`](crate::AdaptiveSampler).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SamplerError {
    /// A construction argument was non-positive where the contract requires `> 0`.
    #[error("invalid sampler configuration: {field} must be positive, got {value}")]
    ConfigurationInvalid {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value, rendered for diagnostics.
        value: String,
    },

    /// The implementation could not allocate a successor window during rotation.
    ///
    /// Unreachable from this crate's own `rotate_window` (Rust aborts on allocation failure
    /// rather than returning here), kept so embedders with a fallible allocator can surface it
    /// through the same type.
    #[error("failed to allocate a successor sampler window")]
    AllocationFailure,

    /// The tick source reported a non-positive elapsed duration for a window.
    ///
    /// Never surfaced to a caller: [`SamplerWindow::adjustment_factor`](crate::window::SamplerWindow::adjustment_factor)
    /// falls back to `1.0` instead. Kept as a variant so the internal detection path has a
    /// named value to log.
    #[error("clock reported non-positive elapsed ticks for the current window")]
    ClockAnomaly,

    /// A `SamplerConfig` TOML document failed to parse (requires the `serde` feature).
    #[error("failed to parse sampler configuration: {0}")]
    ConfigParse(String),
}
