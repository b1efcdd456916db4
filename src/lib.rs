//! An adaptive, rate-targeting event sampler with EWMA feedback and per-window budgets.
//!
//! Designed to sit on a very hot instrumentation path — object-allocation events inside a
//! language runtime, in the setting this crate was extracted from — and emit a bounded stream
//! of samples that tracks a caller-configured long-run target rate, stays representative of the
//! underlying event distribution, and smooths bursts so a single spike neither starves later
//! windows nor blows the sample budget.
//!
//! ## Example
//!
//! Build a sampler targeting roughly 500 samples/minute and gate a hot loop with it.
//!
//! ```rust
//! use adaptive_sampler::{AdaptiveSampler, SamplerConfig};
//!
//! let config = SamplerConfig::for_target_rate(500);
//! let sampler = AdaptiveSampler::new(config).unwrap();
//!
//! let mut accepted = 0;
//! for _ in 0..10_000 {
//!     if sampler.should_sample() {
//!         accepted += 1;
//!     }
//! }
//! println!("{accepted} of 10000 events sampled");
//! ```
//!
//! ## Rate guarantee
//!
//! The target rate is soft: the sampler bounds overshoot but does not guarantee exactness,
//! typically staying within ~15-20% of the target even under adversarial bursty workloads. See
//! [`AdaptiveSampler`] for the feedback law and `tests/scenarios.rs` for the stationary- and
//! bursty-rate scenarios this crate is validated against.

pub mod clock;
pub mod config;
pub mod error;
pub mod observability;
pub mod rng;
mod sampler;
pub mod tracer;
mod window;

pub use config::SamplerConfig;
pub use error::SamplerError;
pub use observability::SamplerSnapshot;
pub use sampler::AdaptiveSampler;
pub use tracer::{AllocationTracer, EventSink, TracerPolicy};
pub use window::SamplerWindow;
