//! Loss configuration with builder pattern.
//!
//! [`OrdinalLossConfig`] collects the setup-time parameters of the loss and
//! resolves them into an [`OrdinalLossEngine`]. It uses the `bon` crate for
//! builder generation with validation at build time.
//!
//! # Example
//!
//! ```
//! use ordinal_loss::{OrdinalLossConfig, Parallelism};
//!
//! // K inferred from the score row width, unit weights
//! let config = OrdinalLossConfig::builder().build().unwrap();
//! let engine = config.resolve(Some(8)).unwrap();
//! assert_eq!(engine.n_thresholds(), 4);
//!
//! // Explicit K and weights
//! let config = OrdinalLossConfig::builder()
//!     .n_thresholds(3)
//!     .weights(vec![1.0, 2.0, 0.5])
//!     .parallelism(Parallelism::Parallel)
//!     .build()
//!     .unwrap();
//! let engine = config.resolve(None).unwrap();
//! assert_eq!(engine.weights().as_slice(), &[1.0, 2.0, 0.5]);
//! ```

use std::path::PathBuf;

use bon::Builder;

use crate::engine::OrdinalLossEngine;
use crate::utils::Parallelism;
use crate::weights::{ThresholdWeights, WeightError};

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation or resolution.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("n_thresholds must be at least 1")]
    ZeroThresholds,

    #[error("cannot infer n_thresholds: no row width given and none configured")]
    UnknownThresholds,

    #[error("cannot infer n_thresholds from row width {0}")]
    RowWidthTooSmall(usize),

    #[error("weights and weight_file are mutually exclusive")]
    ConflictingWeightSources,

    #[error("expected {expected} weights for {expected} thresholds, got {got}")]
    WeightCount { expected: usize, got: usize },

    #[error(transparent)]
    Weights(#[from] WeightError),
}

// =============================================================================
// OrdinalLossConfig
// =============================================================================

/// Setup-time configuration of the ordinal regression loss.
///
/// # Threshold count
///
/// When `n_thresholds` is `None`, it is inferred as `row_width / 2` from the
/// first score buffer the loss sees (see [`resolve`](Self::resolve)).
///
/// # Weights
///
/// At most one of `weights` and `weight_file` may be set. With neither,
/// every threshold gets weight `1.0`.
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct OrdinalLossConfig {
    /// Number of thresholds `K`. Default: inferred from the row width.
    pub n_thresholds: Option<usize>,

    /// Explicit per-threshold weights.
    pub weights: Option<Vec<f32>>,

    /// Text file with `K` whitespace-separated weights, read at resolve time.
    #[builder(into)]
    pub weight_file: Option<PathBuf>,

    /// Row parallelism. Default: `Sequential`.
    #[builder(default)]
    pub parallelism: Parallelism,
}

/// Custom finishing function that validates the config.
impl<S: ordinal_loss_config_builder::IsComplete> OrdinalLossConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if:
    /// - `n_thresholds == 0`
    /// - both `weights` and `weight_file` are set
    /// - `weights` has a negative or non-finite entry
    /// - `weights.len() != n_thresholds` when both are set
    pub fn build(self) -> Result<OrdinalLossConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl Default for OrdinalLossConfig {
    fn default() -> Self {
        Self {
            n_thresholds: None,
            weights: None,
            weight_file: None,
            parallelism: Parallelism::Sequential,
        }
    }
}

impl OrdinalLossConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.n_thresholds == Some(0) {
            return Err(ConfigError::ZeroThresholds);
        }
        if self.weights.is_some() && self.weight_file.is_some() {
            return Err(ConfigError::ConflictingWeightSources);
        }
        if let Some(weights) = &self.weights {
            ThresholdWeights::new(weights.clone())?;
            if let Some(k) = self.n_thresholds {
                if weights.len() != k {
                    return Err(ConfigError::WeightCount {
                        expected: k,
                        got: weights.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Determine `K`, using `row_width / 2` when it is not configured.
    ///
    /// Explicit weights also fix `K` when `n_thresholds` is absent.
    pub fn n_thresholds_for(&self, row_width: Option<usize>) -> Result<usize, ConfigError> {
        if let Some(k) = self.n_thresholds {
            return Ok(k);
        }
        if let Some(weights) = &self.weights {
            return Ok(weights.len());
        }
        let width = row_width.ok_or(ConfigError::UnknownThresholds)?;
        let k = width / 2;
        if k == 0 {
            return Err(ConfigError::RowWidthTooSmall(width));
        }
        log::debug!("inferred n_thresholds = {} from row width {}", k, width);
        Ok(k)
    }

    /// Resolve into an engine, loading the weight file if one is configured.
    ///
    /// `row_width` is the score row width, used only to infer `K`.
    pub fn resolve(&self, row_width: Option<usize>) -> Result<OrdinalLossEngine, ConfigError> {
        self.validate()?;
        let k = self.n_thresholds_for(row_width)?;

        let weights = match (&self.weights, &self.weight_file) {
            (Some(weights), _) => ThresholdWeights::new(weights.clone())?,
            (None, Some(path)) => ThresholdWeights::from_path(path, k)?,
            (None, None) => ThresholdWeights::uniform(k)?,
        };

        Ok(OrdinalLossEngine::new(weights).with_parallelism(self.parallelism))
    }
}
