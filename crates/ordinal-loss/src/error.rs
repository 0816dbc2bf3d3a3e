//! Error types for the forward and backward passes.

/// Errors raised by the loss engine and layer.
///
/// All variants are contract violations by the caller: the pass does not
/// run and no output buffer is touched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LossError {
    #[error("input must be (N, 2K) with K = {n_thresholds}: expected row width {expected}, got {got}")]
    RowWidth {
        n_thresholds: usize,
        expected: usize,
        got: usize,
    },

    #[error("label count mismatch: {n_samples} score rows but {n_labels} labels")]
    LabelCount { n_samples: usize, n_labels: usize },

    #[error("output buffer shape {got:?} does not match input shape {expected:?}")]
    OutputShape {
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("label {label} at sample {index} is outside [0, {n_thresholds}]")]
    LabelOutOfRange {
        index: usize,
        label: f32,
        n_thresholds: usize,
    },

    #[error("label {label} at sample {index} is not an integer")]
    LabelNotInteger { index: usize, label: f32 },

    #[error("ordinal regression loss cannot backpropagate to label inputs")]
    LabelGradient,
}
