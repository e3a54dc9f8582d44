//! Configuration for the [`Explorer`](crate::Explorer).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use vecscope_core::{Result, VecscopeError};
use vecscope_projection::ProjectorConfig;

use crate::ranker::DEFAULT_TOP_CORRELATIONS;
use crate::sampler::DEFAULT_OVERSAMPLE_FACTOR;

/// Default number of rows drawn for a projected view.
pub const DEFAULT_SAMPLE_LIMIT: usize = 1000;

/// Default upper bound on one projection call.
pub const DEFAULT_PROJECTION_TIMEOUT: Duration = Duration::from_secs(120);

/// Tunables of the sampling, projection and correlation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// How much the Bernoulli sample over-draws relative to the target count.
    pub oversample_factor: f64,
    /// Maximum number of correlations returned per point.
    pub top_correlations: usize,
    /// Row count used by [`Explorer::sampling_request`](crate::Explorer::sampling_request).
    pub default_sample_limit: usize,
    /// Upper bound on one projection call.
    #[serde(with = "duration_secs")]
    pub projection_timeout: Duration,
    /// Which projector [`Explorer::from_config`](crate::Explorer::from_config) builds.
    pub projector: ProjectorConfig,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            oversample_factor: DEFAULT_OVERSAMPLE_FACTOR,
            top_correlations: DEFAULT_TOP_CORRELATIONS,
            default_sample_limit: DEFAULT_SAMPLE_LIMIT,
            projection_timeout: DEFAULT_PROJECTION_TIMEOUT,
            projector: ProjectorConfig::default(),
        }
    }
}

impl ExplorerConfig {
    /// Create a new builder for constructing an [`ExplorerConfig`].
    pub fn builder() -> ExplorerConfigBuilder {
        ExplorerConfigBuilder::default()
    }

    /// Check that every field is usable.
    ///
    /// # Errors
    ///
    /// Returns [`VecscopeError::Config`] if:
    /// - `oversample_factor` is below 1.0 or not finite
    /// - `top_correlations` or `default_sample_limit` is zero
    /// - `projection_timeout` is zero
    /// - the projector configuration is invalid
    pub fn validate(&self) -> Result<()> {
        if !self.oversample_factor.is_finite() || self.oversample_factor < 1.0 {
            return Err(VecscopeError::Config(format!(
                "oversample_factor ({}) must be a finite number >= 1.0",
                self.oversample_factor
            )));
        }
        if self.top_correlations == 0 {
            return Err(VecscopeError::Config(
                "top_correlations must be greater than zero".to_string(),
            ));
        }
        if self.default_sample_limit == 0 {
            return Err(VecscopeError::Config(
                "default_sample_limit must be greater than zero".to_string(),
            ));
        }
        if self.projection_timeout.is_zero() {
            return Err(VecscopeError::Config(
                "projection_timeout must be greater than zero".to_string(),
            ));
        }
        self.projector.validate()
    }
}

/// Builder for constructing a validated [`ExplorerConfig`].
#[derive(Debug, Clone, Default)]
pub struct ExplorerConfigBuilder {
    config: ExplorerConfig,
}

impl ExplorerConfigBuilder {
    pub fn oversample_factor(mut self, factor: f64) -> Self {
        self.config.oversample_factor = factor;
        self
    }

    pub fn top_correlations(mut self, k: usize) -> Self {
        self.config.top_correlations = k;
        self
    }

    pub fn default_sample_limit(mut self, limit: usize) -> Self {
        self.config.default_sample_limit = limit;
        self
    }

    pub fn projection_timeout(mut self, timeout: Duration) -> Self {
        self.config.projection_timeout = timeout;
        self
    }

    pub fn projector(mut self, projector: ProjectorConfig) -> Self {
        self.config.projector = projector;
        self
    }

    /// Build the [`ExplorerConfig`], validating it.
    pub fn build(self) -> Result<ExplorerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Serialize a [`Duration`] as (fractional) seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
