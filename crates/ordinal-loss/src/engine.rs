//! Ordinal regression loss engine.
//!
//! An ordinal label `L ∈ [0, K]` is decomposed into `K` binary decisions
//! "does the sample exceed threshold `j`?". Each threshold owns a pair of raw
//! scores turned into probabilities by a two-way softmax.
//!
//! - Loss: `(1/N) Σ_i Σ_j -w_j · ln(max(p_ij[side], ε))`, where `side` is
//!   slot 1 for `j < L` and slot 0 otherwise
//! - Gradient: `w_j · (p_ij - onehot(side)) / N` for both slots of each pair
//!
//! # Layout
//!
//! All buffers are sample-major `[n_samples, 2K]`. Rows are independent, so
//! both passes can run row-parallel without changing their result.

use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1, ArrayViewMut2, Zip};

use crate::error::LossError;
use crate::threshold::{ThresholdSide, neg_log, pair_softmax};
use crate::utils::Parallelism;
use crate::views::{LabelsView, PairsView, label_rank};
use crate::weights::{ThresholdWeights, WeightError};

/// Loss and probabilities produced by a forward pass.
#[derive(Debug, Clone)]
pub struct ForwardOutput {
    /// Mean weighted loss over the batch.
    pub loss: f64,
    /// Pairwise softmax probabilities, same shape as the scores.
    pub probabilities: Array2<f32>,
}

/// Weighted ordinal regression loss over `K` threshold pairs.
///
/// Holds only immutable configuration, so one engine can serve concurrent
/// batches as long as each call gets its own buffers.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use ordinal_loss::{LabelsView, OrdinalLossEngine, PairsView};
///
/// let engine = OrdinalLossEngine::uniform(1).unwrap();
/// let scores = array![[0.0f32, 0.0]];
/// let labels = [0.0f32];
///
/// let out = engine
///     .forward(PairsView::from_array(scores.view()), LabelsView::from_slice(&labels))
///     .unwrap();
/// assert!((out.loss - std::f64::consts::LN_2).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct OrdinalLossEngine {
    weights: ThresholdWeights,
    parallelism: Parallelism,
}

impl OrdinalLossEngine {
    /// Create an engine with one weight per threshold.
    pub fn new(weights: ThresholdWeights) -> Self {
        log::debug!("ordinal loss engine: K = {}", weights.n_thresholds());
        Self {
            weights,
            parallelism: Parallelism::Sequential,
        }
    }

    /// Engine with `n_thresholds` unit weights.
    ///
    /// # Errors
    ///
    /// Returns [`WeightError::Empty`] when `n_thresholds` is zero.
    pub fn uniform(n_thresholds: usize) -> Result<Self, WeightError> {
        ThresholdWeights::uniform(n_thresholds).map(Self::new)
    }

    /// Set the row parallelism mode.
    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Number of thresholds `K`.
    #[inline]
    pub fn n_thresholds(&self) -> usize {
        self.weights.n_thresholds()
    }

    /// Expected score row width, `2K`.
    #[inline]
    pub fn row_width(&self) -> usize {
        2 * self.n_thresholds()
    }

    /// Per-threshold weights.
    pub fn weights(&self) -> &ThresholdWeights {
        &self.weights
    }

    /// Row parallelism mode.
    pub fn parallelism(&self) -> Parallelism {
        self.parallelism
    }

    /// Check that a buffer row width equals `2K`.
    pub fn check_row_width(&self, row_width: usize) -> Result<(), LossError> {
        if row_width != self.row_width() {
            return Err(LossError::RowWidth {
                n_thresholds: self.n_thresholds(),
                expected: self.row_width(),
                got: row_width,
            });
        }
        Ok(())
    }

    pub(crate) fn check_batch(&self, pairs: PairsView<'_>, labels: LabelsView<'_>) -> Result<(), LossError> {
        self.check_row_width(pairs.row_width())?;
        if labels.len() != pairs.n_samples() {
            return Err(LossError::LabelCount {
                n_samples: pairs.n_samples(),
                n_labels: labels.len(),
            });
        }
        Ok(())
    }

    fn check_output(&self, pairs: PairsView<'_>, out: &ArrayViewMut2<'_, f32>) -> Result<(), LossError> {
        if out.dim() != pairs.view().dim() {
            return Err(LossError::OutputShape {
                expected: pairs.view().dim(),
                got: out.dim(),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Forward
    // =========================================================================

    /// Compute the mean loss and the probability buffer.
    pub fn forward(
        &self,
        scores: PairsView<'_>,
        labels: LabelsView<'_>,
    ) -> Result<ForwardOutput, LossError> {
        let mut probabilities = Array2::zeros(scores.view().dim());
        let loss = self.forward_into(scores, labels, probabilities.view_mut())?;
        Ok(ForwardOutput { loss, probabilities })
    }

    /// Compute the mean loss, writing probabilities into `probabilities`.
    ///
    /// `probabilities` must have the same shape as `scores`. An empty batch
    /// has zero loss.
    pub fn forward_into(
        &self,
        scores: PairsView<'_>,
        labels: LabelsView<'_>,
        mut probabilities: ArrayViewMut2<'_, f32>,
    ) -> Result<f64, LossError> {
        self.check_batch(scores, labels)?;
        self.check_output(scores, &probabilities)?;

        let n_samples = scores.n_samples();
        if n_samples == 0 {
            return Ok(0.0);
        }

        let scores = scores.view();
        let mut row_losses = Array1::<f64>::zeros(n_samples);
        let zip = Zip::from(probabilities.rows_mut())
            .and(scores.rows())
            .and(labels.view())
            .and(&mut row_losses);

        let row_fn = |probs: ArrayViewMut1<'_, f32>, x: ArrayView1<'_, f32>, &label: &f32, loss: &mut f64| {
            *loss = self.forward_row(x, label_rank(label), probs);
        };
        if self.parallelism.is_parallel() {
            zip.par_for_each(row_fn);
        } else {
            zip.for_each(row_fn);
        }

        // Reduced in row order so the result does not depend on scheduling.
        Ok(row_losses.iter().sum::<f64>() / n_samples as f64)
    }

    #[inline]
    fn forward_row(&self, x: ArrayView1<'_, f32>, rank: i64, mut probs: ArrayViewMut1<'_, f32>) -> f64 {
        let mut loss = 0.0f64;
        for (j, &w) in self.weights.iter().enumerate() {
            let (p0, p1) = pair_softmax(x[2 * j], x[2 * j + 1]);
            probs[2 * j] = p0;
            probs[2 * j + 1] = p1;

            let p = match ThresholdSide::of(rank, j) {
                ThresholdSide::Above => p1,
                ThresholdSide::Below => p0,
            };
            loss += w as f64 * neg_log(p);
        }
        loss
    }

    // =========================================================================
    // Backward
    // =========================================================================

    /// Gradient of the mean loss with respect to the scores.
    ///
    /// `probabilities` must be the forward output for the same batch; this is
    /// not checked.
    pub fn backward(
        &self,
        probabilities: PairsView<'_>,
        labels: LabelsView<'_>,
    ) -> Result<Array2<f32>, LossError> {
        let mut gradient = Array2::zeros(probabilities.view().dim());
        self.backward_into(probabilities, labels, gradient.view_mut())?;
        Ok(gradient)
    }

    /// Write the score gradient into `gradient`, overwriting it entirely.
    pub fn backward_into(
        &self,
        probabilities: PairsView<'_>,
        labels: LabelsView<'_>,
        mut gradient: ArrayViewMut2<'_, f32>,
    ) -> Result<(), LossError> {
        self.check_batch(probabilities, labels)?;
        self.check_output(probabilities, &gradient)?;

        let n_samples = probabilities.n_samples();
        if n_samples == 0 {
            return Ok(());
        }
        let scale = 1.0 / n_samples as f32;

        let probabilities = probabilities.view();
        let zip = Zip::from(gradient.rows_mut())
            .and(probabilities.rows())
            .and(labels.view());

        let row_fn = |dx: ArrayViewMut1<'_, f32>, p: ArrayView1<'_, f32>, &label: &f32| {
            self.backward_row(p, label_rank(label), scale, dx);
        };
        if self.parallelism.is_parallel() {
            zip.par_for_each(row_fn);
        } else {
            zip.for_each(row_fn);
        }
        Ok(())
    }

    #[inline]
    fn backward_row(&self, p: ArrayView1<'_, f32>, rank: i64, scale: f32, mut dx: ArrayViewMut1<'_, f32>) {
        for (j, &w) in self.weights.iter().enumerate() {
            let (lo, hi) = (2 * j, 2 * j + 1);
            dx[lo] = p[lo];
            dx[hi] = p[hi];
            dx[2 * j + ThresholdSide::of(rank, j).slot()] -= 1.0;
            dx[lo] = dx[lo] * w * scale;
            dx[hi] = dx[hi] * w * scale;
        }
    }

    // =========================================================================
    // Decoding
    // =========================================================================

    /// Decode a rank per sample from forward probabilities.
    ///
    /// The rank is the number of thresholds whose "above" probability is
    /// greater than 0.5.
    pub fn predict_ranks(&self, probabilities: PairsView<'_>) -> Result<Array1<u32>, LossError> {
        self.check_row_width(probabilities.row_width())?;
        let k = self.n_thresholds();
        Ok(probabilities
            .view()
            .rows()
            .into_iter()
            .map(|row| (0..k).filter(|&j| row[2 * j + 1] > 0.5).count() as u32)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn run(engine: &OrdinalLossEngine, scores: &Array2<f32>, labels: &[f32]) -> (ForwardOutput, Array2<f32>) {
        let labels = LabelsView::from_slice(labels);
        let out = engine.forward(PairsView::from_array(scores.view()), labels).unwrap();
        let grad = engine
            .backward(PairsView::from_array(out.probabilities.view()), labels)
            .unwrap();
        (out, grad)
    }

    #[test]
    fn single_threshold_even_scores() {
        let engine = OrdinalLossEngine::uniform(1).unwrap();
        let (out, grad) = run(&engine, &array![[0.0, 0.0]], &[0.0]);

        assert_abs_diff_eq!(out.probabilities, array![[0.5, 0.5]]);
        assert_abs_diff_eq!(out.loss, std::f64::consts::LN_2, epsilon = 1e-6);
        assert_abs_diff_eq!(grad, array![[-0.5, 0.5]]);
    }

    #[test]
    fn confident_wrong_predictions() {
        // Label 1: threshold 0 targets slot 1, threshold 1 targets slot 0.
        // Both pairs put almost all mass on the other slot.
        let engine = OrdinalLossEngine::uniform(2).unwrap();
        let (out, grad) = run(&engine, &array![[10.0, -10.0, -10.0, 10.0]], &[1.0]);

        let p = &out.probabilities;
        assert_abs_diff_eq!(p[[0, 0]], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p[[0, 1]], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p[[0, 2]], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p[[0, 3]], 1.0, epsilon = 1e-6);

        // -ln(sigmoid(-20)) ≈ 20 per threshold
        assert_abs_diff_eq!(out.loss, 40.0, epsilon = 1e-3);
        assert_abs_diff_eq!(grad, array![[1.0, -1.0, -1.0, 1.0]], epsilon = 1e-6);
    }

    #[test]
    fn confident_right_predictions() {
        let engine = OrdinalLossEngine::uniform(2).unwrap();
        let (out, _) = run(&engine, &array![[-20.0, 20.0, 20.0, -20.0]], &[1.0]);
        assert!(out.loss < 1e-8);
    }

    #[test]
    fn underflow_is_clamped() {
        let engine = OrdinalLossEngine::uniform(1).unwrap();
        let (out, _) = run(&engine, &array![[200.0, -200.0]], &[1.0]);

        assert_eq!(out.probabilities[[0, 1]], 0.0);
        assert!(out.loss.is_finite());
        assert_abs_diff_eq!(out.loss, -(f32::MIN_POSITIVE as f64).ln(), epsilon = 1e-9);
    }

    #[test]
    fn weights_scale_each_threshold() {
        let weights = ThresholdWeights::new(vec![2.0, 0.0]).unwrap();
        let engine = OrdinalLossEngine::new(weights);
        let (out, grad) = run(&engine, &array![[0.0, 0.0, 0.0, 0.0]], &[2.0]);

        // threshold 1 has zero weight
        assert_abs_diff_eq!(out.loss, 2.0 * std::f64::consts::LN_2, epsilon = 1e-6);
        assert_abs_diff_eq!(grad, array![[1.0, -1.0, 0.0, 0.0]]);
    }

    #[test]
    fn gradient_is_mean_reduced() {
        let engine = OrdinalLossEngine::uniform(1).unwrap();
        let (_, grad) = run(&engine, &array![[0.0, 0.0], [0.0, 0.0]], &[0.0, 1.0]);
        assert_abs_diff_eq!(grad, array![[-0.25, 0.25], [0.25, -0.25]]);
    }

    #[test]
    fn backward_overwrites_output() {
        let engine = OrdinalLossEngine::uniform(1).unwrap();
        let probs = array![[0.5f32, 0.5]];
        let labels = [0.0f32];
        let mut grad = Array2::from_elem((1, 2), 123.0f32);
        engine
            .backward_into(
                PairsView::from_array(probs.view()),
                LabelsView::from_slice(&labels),
                grad.view_mut(),
            )
            .unwrap();
        assert_abs_diff_eq!(grad, array![[-0.5, 0.5]]);
    }

    #[test]
    fn zero_thresholds_rejected() {
        assert!(matches!(OrdinalLossEngine::uniform(0), Err(WeightError::Empty)));
    }

    #[test]
    fn empty_batch() {
        let engine = OrdinalLossEngine::uniform(3).unwrap();
        let (out, grad) = run(&engine, &Array2::zeros((0, 6)), &[]);
        assert_eq!(out.loss, 0.0);
        assert_eq!(grad.dim(), (0, 6));
    }

    #[test]
    fn row_width_mismatch() {
        let engine = OrdinalLossEngine::uniform(2).unwrap();
        let scores = Array2::<f32>::zeros((1, 3));
        let err = engine
            .forward(PairsView::from_array(scores.view()), LabelsView::from_slice(&[0.0]))
            .unwrap_err();
        assert_eq!(
            err,
            LossError::RowWidth {
                n_thresholds: 2,
                expected: 4,
                got: 3
            }
        );
    }

    #[test]
    fn label_count_mismatch() {
        let engine = OrdinalLossEngine::uniform(1).unwrap();
        let scores = Array2::<f32>::zeros((2, 2));
        let err = engine
            .forward(PairsView::from_array(scores.view()), LabelsView::from_slice(&[0.0]))
            .unwrap_err();
        assert!(matches!(err, LossError::LabelCount { n_samples: 2, n_labels: 1 }));
    }

    #[test]
    fn output_shape_mismatch() {
        let engine = OrdinalLossEngine::uniform(1).unwrap();
        let scores = Array2::<f32>::zeros((2, 2));
        let mut probs = Array2::<f32>::zeros((1, 2));
        let err = engine
            .forward_into(
                PairsView::from_array(scores.view()),
                LabelsView::from_slice(&[0.0, 1.0]),
                probs.view_mut(),
            )
            .unwrap_err();
        assert!(matches!(err, LossError::OutputShape { .. }));
    }

    #[test]
    fn out_of_range_labels_still_partition() {
        // Rank above K behaves like K, negative ranks like 0.
        let engine = OrdinalLossEngine::uniform(2).unwrap();
        let scores = array![[0.3, -0.1, 1.2, 0.4]];
        let (high, _) = run(&engine, &scores, &[7.0]);
        let (top, _) = run(&engine, &scores, &[2.0]);
        let (neg, _) = run(&engine, &scores, &[-3.0]);
        let (zero, _) = run(&engine, &scores, &[0.0]);

        assert_eq!(high.loss, top.loss);
        assert_eq!(neg.loss, zero.loss);
    }

    #[test]
    fn predict_ranks_counts_thresholds() {
        let engine = OrdinalLossEngine::uniform(3).unwrap();
        let probs = array![
            [0.1f32, 0.9, 0.2, 0.8, 0.7, 0.3],
            [0.9, 0.1, 0.8, 0.2, 0.6, 0.4],
            [0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
        ];
        let ranks = engine.predict_ranks(PairsView::from_array(probs.view())).unwrap();
        assert_eq!(ranks, array![2u32, 0, 3]);
    }
}
