//! Stateful loss layer that retains the forward probabilities.
//!
//! [`OrdinalLossLayer`] pairs an engine with the probability buffer of the
//! last forward pass, so `backward` only needs the labels. It follows the
//! usual setup → reshape → forward → backward cycle of a training layer.

use ndarray::{Array2, ArrayView2};

use crate::config::{ConfigError, OrdinalLossConfig};
use crate::engine::OrdinalLossEngine;
use crate::error::LossError;
use crate::views::{LabelsView, PairsView};

/// Which inputs a backward pass should produce gradients for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagateDown {
    /// Gradient with respect to the scores.
    pub scores: bool,
    /// Gradient with respect to the labels. Never supported.
    pub labels: bool,
}

impl PropagateDown {
    /// Scores only, the common case.
    pub const SCORES: Self = Self {
        scores: true,
        labels: false,
    };
}

impl Default for PropagateDown {
    fn default() -> Self {
        Self::SCORES
    }
}

/// Ordinal regression loss layer.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use ordinal_loss::{LabelsView, OrdinalLossConfig, OrdinalLossLayer, PairsView, PropagateDown};
///
/// let scores = array![[0.0f32, 0.0, 1.0, -1.0]];
/// let labels = [1.0f32];
///
/// let config = OrdinalLossConfig::builder().build().unwrap();
/// let mut layer = OrdinalLossLayer::setup(&config, scores.ncols()).unwrap();
///
/// let loss = layer
///     .forward(PairsView::from_array(scores.view()), LabelsView::from_slice(&labels))
///     .unwrap();
/// assert!(loss > 0.0);
///
/// let grad = layer
///     .backward(LabelsView::from_slice(&labels), PropagateDown::SCORES)
///     .unwrap()
///     .unwrap();
/// assert_eq!(grad.dim(), scores.dim());
/// ```
#[derive(Debug, Clone)]
pub struct OrdinalLossLayer {
    engine: OrdinalLossEngine,
    probabilities: Array2<f32>,
}

impl OrdinalLossLayer {
    /// Resolve the configuration against the score row width.
    ///
    /// `K` is inferred as `row_width / 2` when the config leaves it unset.
    ///
    /// # Errors
    ///
    /// Configuration errors, and [`LossError::RowWidth`] (wrapped in
    /// [`LayerSetupError::Shape`]) when `row_width != 2K`.
    pub fn setup(config: &OrdinalLossConfig, row_width: usize) -> Result<Self, LayerSetupError> {
        let engine = config.resolve(Some(row_width))?;
        Self::with_engine(engine, row_width)
    }

    /// Wrap an existing engine.
    pub fn with_engine(engine: OrdinalLossEngine, row_width: usize) -> Result<Self, LayerSetupError> {
        let mut layer = Self {
            engine,
            probabilities: Array2::zeros((0, row_width)),
        };
        layer.reshape(0, row_width)?;
        Ok(layer)
    }

    /// Validate the row width and size the probability buffer for `n_samples` rows.
    pub fn reshape(&mut self, n_samples: usize, row_width: usize) -> Result<(), LossError> {
        if let Err(err) = self.engine.check_row_width(row_width) {
            log::error!("ordinal loss reshape: {err}");
            return Err(err);
        }
        if self.probabilities.dim() != (n_samples, row_width) {
            self.probabilities = Array2::zeros((n_samples, row_width));
        }
        Ok(())
    }

    /// Run the forward pass and retain the probabilities.
    ///
    /// A rejected batch leaves the previous probabilities in place.
    pub fn forward(&mut self, scores: PairsView<'_>, labels: LabelsView<'_>) -> Result<f64, LossError> {
        self.engine.check_batch(scores, labels)?;
        self.reshape(scores.n_samples(), scores.row_width())?;
        self.engine
            .forward_into(scores, labels, self.probabilities.view_mut())
    }

    /// Score gradient from the retained probabilities.
    ///
    /// Returns `Ok(None)` when `propagate.scores` is false. The labels must
    /// be the ones given to the preceding [`forward`](Self::forward).
    ///
    /// # Errors
    ///
    /// [`LossError::LabelGradient`] if `propagate.labels` is set.
    pub fn backward(
        &self,
        labels: LabelsView<'_>,
        propagate: PropagateDown,
    ) -> Result<Option<Array2<f32>>, LossError> {
        if propagate.labels {
            log::error!("ordinal regression loss cannot backpropagate to label inputs");
            return Err(LossError::LabelGradient);
        }
        if !propagate.scores {
            return Ok(None);
        }
        self.engine
            .backward(PairsView::from_array(self.probabilities.view()), labels)
            .map(Some)
    }

    /// Probabilities of the last forward pass.
    pub fn probabilities(&self) -> ArrayView2<'_, f32> {
        self.probabilities.view()
    }

    /// The engine behind this layer.
    pub fn engine(&self) -> &OrdinalLossEngine {
        &self.engine
    }
}

/// Errors raised by [`OrdinalLossLayer::setup`].
#[derive(Debug, thiserror::Error)]
pub enum LayerSetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Shape(#[from] LossError),
}
