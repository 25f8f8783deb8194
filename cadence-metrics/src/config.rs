//! Monitor configuration.

use cadence_core::{CadenceResult, ConfigError};
use serde::{Deserialize, Serialize};

/// Configuration for a [`PerformanceMonitor`](crate::PerformanceMonitor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Probability in [0, 1] that a `start_measure` call produces a handle.
    pub sample_rate: f64,
    /// Ceiling on distinct metric names; the oldest aggregate is evicted
    /// past this.
    pub max_metrics: usize,
    /// Ring size of recent raw durations kept per metric for percentile
    /// estimation.
    pub max_samples: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 1.0,
            max_metrics: 50,
            max_samples: 100,
        }
    }
}

impl MonitorConfig {
    /// Create a new monitor config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sampling probability.
    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the ceiling on distinct metric names.
    pub fn with_max_metrics(mut self, max_metrics: usize) -> Self {
        self.max_metrics = max_metrics;
        self
    }

    /// Set the percentile ring size.
    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> CadenceResult<()> {
        if !(0.0..=1.0).contains(&self.sample_rate) {
            return Err(ConfigError::invalid_value(
                "sample_rate",
                self.sample_rate,
                "must be within [0, 1]",
            )
            .into());
        }
        if self.max_metrics == 0 {
            return Err(ConfigError::invalid_value(
                "max_metrics",
                self.max_metrics,
                "must track at least one metric",
            )
            .into());
        }
        if self.max_samples == 0 {
            return Err(ConfigError::invalid_value(
                "max_samples",
                self.max_samples,
                "must keep at least one sample",
            )
            .into());
        }
        Ok(())
    }
}
