//! Prediction output post-processing
//!
//! Converts raw model outputs into wait estimates with a positive floor,
//! a ceiling, and a fixed fallback when no usable output exists.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Minimum estimate ever returned
pub const MIN_WAIT_MINUTES: f64 = 1.0;

/// Maximum estimate ever returned (4 hours)
pub const MAX_WAIT_MINUTES: f64 = 240.0;

/// Estimate used when no model is loaded or the output is unusable
pub const FALLBACK_WAIT_MINUTES: f64 = 15.0;

/// Version label attached to fallback estimates
pub const FALLBACK_VERSION: &str = "fallback";

/// Where an estimate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateSource {
    Model,
    Fallback,
}

/// A point estimate of an order's wait
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitEstimate {
    pub minutes: f64,
    pub model_version: String,
    pub source: EstimateSource,
}

impl WaitEstimate {
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs_f64(self.minutes * 60.0)
    }

    pub fn is_fallback(&self) -> bool {
        self.source == EstimateSource::Fallback
    }
}

/// Configuration for output formatting
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub min_wait_minutes: f64,
    pub max_wait_minutes: f64,
    pub fallback_wait_minutes: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            min_wait_minutes: MIN_WAIT_MINUTES,
            max_wait_minutes: MAX_WAIT_MINUTES,
            fallback_wait_minutes: FALLBACK_WAIT_MINUTES,
        }
    }
}

/// Formats raw model outputs into clamped wait estimates
#[derive(Debug, Clone, Default)]
pub struct OutputFormatter {
    config: OutputConfig,
}

impl OutputFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Clamp a raw model output. Non-finite output degrades to the fallback.
    pub fn format(&self, raw_minutes: f64, model_version: &str) -> WaitEstimate {
        if !raw_minutes.is_finite() {
            return self.fallback();
        }
        WaitEstimate {
            minutes: raw_minutes.clamp(self.config.min_wait_minutes, self.config.max_wait_minutes),
            model_version: model_version.to_string(),
            source: EstimateSource::Model,
        }
    }

    pub fn fallback(&self) -> WaitEstimate {
        WaitEstimate {
            minutes: self.config.fallback_wait_minutes,
            model_version: FALLBACK_VERSION.to_string(),
            source: EstimateSource::Fallback,
        }
    }
}
