//! Turning a caller-facing target rate into [`crate::AdaptiveSampler`] constructor arguments.

use crate::error::SamplerError;

#[cfg(feature = "serde")]
use serde::Deserialize;

/// Construction parameters for an [`crate::AdaptiveSampler`].
///
/// Build one directly with [`SamplerConfig::new`], derive one from a target rate with
/// [`SamplerConfig::for_target_rate`], or (with the `serde` feature) deserialize one from a TOML
/// file with [`SamplerConfig::from_toml_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct SamplerConfig {
    /// Nominal duration of one window, in milliseconds.
    pub window_duration_ms: u64,

    /// Target accepted samples per window, `T`.
    pub samples_per_window: u64,

    /// Lookback (in windows) for the `avg_count` EWMA.
    pub window_lookback: u64,

    /// Lookback (in windows) for the `avg_samples` EWMA and the budget carry-over.
    pub budget_lookback: u64,
}

impl SamplerConfig {
    /// Builds a config directly, validating all four arguments are positive.
    pub fn new(
        window_duration_ms: u64,
        samples_per_window: u64,
        window_lookback: u64,
        budget_lookback: u64,
    ) -> Result<Self, SamplerError> {
        let config = Self {
            window_duration_ms,
            samples_per_window,
            window_lookback,
            budget_lookback,
        };
        config.validate()?;
        Ok(config)
    }

    /// Derives a config from a caller-facing "target samples per minute" using the heuristic:
    ///
    /// - `window_ms = 500` if `target_per_min <= 1000`; `50` if `<= 10000`; `20` otherwise.
    /// - `windows_per_min = 60000 / window_ms`.
    /// - `samples_per_window = max(2, target_per_min / windows_per_min)`.
    /// - `window_lookback = windows_per_min / 2`.
    /// - `budget_lookback = floor(windows_per_min * 0.75)`.
    pub fn for_target_rate(target_per_min: u64) -> Self {
        let window_ms: u64 = if target_per_min <= 1000 {
            500
        } else if target_per_min <= 10_000 {
            50
        } else {
            20
        };
        let windows_per_min = 60_000 / window_ms;
        let samples_per_window = (target_per_min / windows_per_min).max(2);
        let window_lookback = (windows_per_min / 2).max(1);
        let budget_lookback = ((windows_per_min as f64 * 0.75).floor() as u64).max(1);

        Self {
            window_duration_ms: window_ms,
            samples_per_window,
            window_lookback,
            budget_lookback,
        }
    }

    /// Loads a config from a TOML document (requires the `serde` feature).
    #[cfg(feature = "serde")]
    pub fn from_toml_str(toml: &str) -> Result<Self, SamplerError> {
        let config: Self =
            toml::from_str(toml).map_err(|e| SamplerError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every field is positive, the contract `AdaptiveSampler::new` requires.
    pub fn validate(&self) -> Result<(), SamplerError> {
        if self.window_duration_ms == 0 {
            return Err(SamplerError::ConfigurationInvalid {
                field: "window_duration_ms",
                value: self.window_duration_ms.to_string(),
            });
        }
        if self.samples_per_window == 0 {
            return Err(SamplerError::ConfigurationInvalid {
                field: "samples_per_window",
                value: self.samples_per_window.to_string(),
            });
        }
        if self.window_lookback == 0 {
            return Err(SamplerError::ConfigurationInvalid {
                field: "window_lookback",
                value: self.window_lookback.to_string(),
            });
        }
        if self.budget_lookback == 0 {
            return Err(SamplerError::ConfigurationInvalid {
                field: "budget_lookback",
                value: self.budget_lookback.to_string(),
            });
        }
        Ok(())
    }
}
