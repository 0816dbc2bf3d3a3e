//! Per-threshold primitives shared by the forward and backward passes.

/// Floor applied to a probability before taking its logarithm.
pub const PROB_FLOOR: f32 = f32::MIN_POSITIVE;

/// Which entry of a threshold pair is the ground truth for a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdSide {
    /// Sample does not exceed the threshold (pair slot 0).
    Below,
    /// Sample exceeds the threshold (pair slot 1).
    Above,
}

impl ThresholdSide {
    /// Ground-truth side of threshold `threshold` for a sample of rank `rank`.
    ///
    /// A sample of rank `L` exceeds thresholds `0..L` and no others.
    #[inline]
    pub fn of(rank: i64, threshold: usize) -> Self {
        if (threshold as i64) < rank {
            ThresholdSide::Above
        } else {
            ThresholdSide::Below
        }
    }

    /// Offset of this side within its pair.
    #[inline]
    pub fn slot(self) -> usize {
        match self {
            ThresholdSide::Below => 0,
            ThresholdSide::Above => 1,
        }
    }
}

/// Numerically stable two-way softmax.
///
/// Returns `(p0, p1)`, both in `[0, 1]` and summing to 1.
#[inline]
pub fn pair_softmax(x0: f32, x1: f32) -> (f32, f32) {
    let max = x0.max(x1);
    let e0 = (x0 - max).exp();
    let e1 = (x1 - max).exp();
    let sum = e0 + e1;
    (e0 / sum, e1 / sum)
}

/// Negative log-likelihood of probability `p`, floored at [`PROB_FLOOR`].
#[inline]
pub(crate) fn neg_log(p: f32) -> f64 {
    -(p.max(PROB_FLOOR) as f64).ln()
}
