//! Synthetic batches and numerical checks for tests and benchmarks.

use ndarray::{Array1, Array2};
use rand::prelude::*;

use crate::engine::OrdinalLossEngine;
use crate::views::{LabelsView, PairsView};

/// Random scores of shape `[n_samples, 2 * n_thresholds]`, uniform in `[-scale, scale]`.
pub fn random_scores(n_samples: usize, n_thresholds: usize, seed: u64, scale: f32) -> Array2<f32> {
    assert!(scale >= 0.0);
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((n_samples, 2 * n_thresholds), |_| {
        (rng.r#gen::<f32>() * 2.0 - 1.0) * scale
    })
}

/// Random integer labels uniform in `[0, n_thresholds]`.
pub fn random_labels(n_samples: usize, n_thresholds: usize, seed: u64) -> Array1<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array1::from_shape_fn(n_samples, |_| rng.gen_range(0..=n_thresholds) as f32)
}

/// Central finite-difference gradient of the mean loss with respect to the scores.
///
/// Loss is evaluated in `f64` but the engine works in `f32`, so `step`
/// should not be much smaller than `1e-3`.
///
/// # Panics
///
/// Panics if the batch shape does not match the engine.
pub fn numeric_gradient(
    engine: &OrdinalLossEngine,
    scores: &Array2<f32>,
    labels: LabelsView<'_>,
    step: f32,
) -> Array2<f32> {
    let loss_at = |x: &Array2<f32>| {
        engine
            .forward(PairsView::from_array(x.view()), labels)
            .expect("batch shape must match the engine")
            .loss
    };

    let mut perturbed = scores.clone();
    let mut grad = Array2::zeros(scores.dim());
    for (idx, g) in grad.indexed_iter_mut() {
        let orig = perturbed[idx];
        perturbed[idx] = orig + step;
        let up = loss_at(&perturbed);
        perturbed[idx] = orig - step;
        let down = loss_at(&perturbed);
        perturbed[idx] = orig;
        *g = ((up - down) / (2.0 * step as f64)) as f32;
    }
    grad
}
