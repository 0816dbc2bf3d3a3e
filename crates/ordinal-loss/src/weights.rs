//! Per-threshold weights.
//!
//! Every threshold `j` carries a non-negative weight that scales both its
//! loss contribution and its gradient. Weights default to `1.0` and can be
//! loaded once at setup from a plain text source holding `K`
//! whitespace-separated reals.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::ops::Deref;
use std::path::Path;

use serde::{Deserialize, Serialize};

// =============================================================================
// WeightError
// =============================================================================

/// Errors produced while building or loading threshold weights.
#[derive(Debug, thiserror::Error)]
pub enum WeightError {
    #[error("I/O error reading weights: {0}")]
    Io(#[from] io::Error),

    #[error("invalid weight token {token:?} at position {position}")]
    Parse { position: usize, token: String },

    #[error("expected {expected} weights, found {found}")]
    Count { expected: usize, found: usize },

    #[error("weight {index} must be finite and non-negative, got {value}")]
    Invalid { index: usize, value: f32 },

    #[error("at least one threshold weight is required")]
    Empty,
}

// =============================================================================
// ThresholdWeights
// =============================================================================

/// Validated weight vector, one entry per threshold.
///
/// Dereferences to `[f32]`, so `weights[j]` and `weights.len()` work directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct ThresholdWeights(Vec<f32>);

impl ThresholdWeights {
    /// All-ones weights for `n_thresholds` thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`WeightError::Empty`] when `n_thresholds` is zero.
    pub fn uniform(n_thresholds: usize) -> Result<Self, WeightError> {
        Self::new(vec![1.0; n_thresholds])
    }

    /// Wrap an explicit weight vector.
    ///
    /// # Errors
    ///
    /// Returns [`WeightError::Empty`] for an empty vector and
    /// [`WeightError::Invalid`] for negative or non-finite entries.
    pub fn new(weights: Vec<f32>) -> Result<Self, WeightError> {
        if weights.is_empty() {
            return Err(WeightError::Empty);
        }
        if let Some((index, &value)) = weights
            .iter()
            .enumerate()
            .find(|&(_, &w)| !w.is_finite() || w < 0.0)
        {
            return Err(WeightError::Invalid { index, value });
        }
        Ok(Self(weights))
    }

    /// Read the first `n_thresholds` whitespace-separated reals from `reader`.
    ///
    /// Trailing tokens past the first `n_thresholds` are ignored.
    pub fn from_reader<R: Read>(mut reader: R, n_thresholds: usize) -> Result<Self, WeightError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;

        let mut weights = Vec::with_capacity(n_thresholds);
        for (position, token) in text.split_whitespace().take(n_thresholds).enumerate() {
            let value = token.parse::<f32>().map_err(|_| WeightError::Parse {
                position,
                token: token.to_string(),
            })?;
            weights.push(value);
        }

        if weights.len() < n_thresholds {
            return Err(WeightError::Count {
                expected: n_thresholds,
                found: weights.len(),
            });
        }
        Self::new(weights)
    }

    /// Load weights from a text file. See [`from_reader`](Self::from_reader).
    pub fn from_path(path: impl AsRef<Path>, n_thresholds: usize) -> Result<Self, WeightError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let weights = Self::from_reader(BufReader::new(file), n_thresholds)?;
        log::debug!("loaded {} threshold weights from {}", n_thresholds, path.display());
        Ok(weights)
    }

    /// Multiply every weight by `factor`.
    pub fn scaled(&self, factor: f32) -> Result<Self, WeightError> {
        Self::new(self.0.iter().map(|w| w * factor).collect())
    }

    /// Number of thresholds.
    #[inline]
    pub fn n_thresholds(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

impl Deref for ThresholdWeights {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}

impl TryFrom<Vec<f32>> for ThresholdWeights {
    type Error = WeightError;

    fn try_from(weights: Vec<f32>) -> Result<Self, Self::Error> {
        Self::new(weights)
    }
}

impl From<ThresholdWeights> for Vec<f32> {
    fn from(weights: ThresholdWeights) -> Self {
        weights.0
    }
}
