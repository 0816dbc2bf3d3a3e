//! Borrowed views over caller-owned batch buffers.
//!
//! Scores, probabilities and gradients share one layout: sample-major
//! `[n_samples, 2 * n_thresholds]`, where columns `2j` and `2j + 1` hold the
//! "below" and "above" entries of threshold `j`.

use ndarray::{ArrayView1, ArrayView2};

use crate::error::LossError;

// =============================================================================
// PairsView
// =============================================================================

/// Read-only view of an `N × 2K` buffer of threshold pairs.
#[derive(Clone, Copy)]
pub struct PairsView<'a> {
    /// Shape: [n_samples, 2 * n_thresholds]
    data: ArrayView2<'a, f32>,
}

impl<'a> PairsView<'a> {
    /// Wrap an array view with shape `[n_samples, row_width]`.
    ///
    /// The row width is not checked here; the engine validates it against
    /// its threshold count.
    pub fn from_array(data: ArrayView2<'a, f32>) -> Self {
        Self { data }
    }

    /// Create from a contiguous row-major slice. Zero-copy.
    ///
    /// Returns `None` if the slice length doesn't match `n_samples * row_width`.
    pub fn from_slice(data: &'a [f32], n_samples: usize, row_width: usize) -> Option<Self> {
        ArrayView2::from_shape((n_samples, row_width), data)
            .ok()
            .map(|data| Self { data })
    }

    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    #[inline]
    pub fn row_width(&self) -> usize {
        self.data.ncols()
    }

    /// The `(below, above)` entries of threshold `threshold` for `sample`.
    #[inline]
    pub fn pair(&self, sample: usize, threshold: usize) -> (f32, f32) {
        (
            self.data[[sample, 2 * threshold]],
            self.data[[sample, 2 * threshold + 1]],
        )
    }

    #[inline]
    pub fn row(&self, sample: usize) -> ArrayView1<'_, f32> {
        self.data.row(sample)
    }

    /// Get the underlying array view.
    pub fn view(&self) -> ArrayView2<'a, f32> {
        self.data
    }
}

impl std::fmt::Debug for PairsView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairsView")
            .field("n_samples", &self.n_samples())
            .field("row_width", &self.row_width())
            .finish()
    }
}

// =============================================================================
// LabelsView
// =============================================================================

/// Read-only view of the ordinal labels, one per sample.
///
/// Labels are integer-valued reals. A label is converted to a rank by
/// truncation toward zero, like an integer cast.
#[derive(Clone, Copy)]
pub struct LabelsView<'a> {
    data: ArrayView1<'a, f32>,
}

impl<'a> LabelsView<'a> {
    pub fn new(data: ArrayView1<'a, f32>) -> Self {
        Self { data }
    }

    pub fn from_slice(data: &'a [f32]) -> Self {
        Self {
            data: ArrayView1::from(data),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Integer rank of sample `index`.
    ///
    /// NaN maps to 0; values beyond the `i64` range saturate.
    #[inline]
    pub fn rank(&self, index: usize) -> i64 {
        label_rank(self.data[index])
    }

    /// Check every label is an integer in `[0, n_thresholds]`.
    ///
    /// The forward and backward passes never call this; it is for callers
    /// that want to reject malformed batches up front.
    pub fn validate(&self, n_thresholds: usize) -> Result<(), LossError> {
        for (index, &label) in self.data.iter().enumerate() {
            let rank = label_rank(label);
            if !label.is_finite() || rank < 0 || rank > n_thresholds as i64 {
                return Err(LossError::LabelOutOfRange {
                    index,
                    label,
                    n_thresholds,
                });
            }
            if label.fract() != 0.0 {
                return Err(LossError::LabelNotInteger { index, label });
            }
        }
        Ok(())
    }

    /// Get the underlying array view.
    pub fn view(&self) -> ArrayView1<'a, f32> {
        self.data
    }
}

impl std::fmt::Debug for LabelsView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelsView").field("n_labels", &self.len()).finish()
    }
}

#[inline]
pub(crate) fn label_rank(label: f32) -> i64 {
    label as i64
}
