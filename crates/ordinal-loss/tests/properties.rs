//! Property tests for the forward and backward passes.
//!
//! Generates arbitrary batches and verifies the invariants that must hold
//! for every input: normalized probability pairs, non-negative loss,
//! shape-preserving gradients and balanced per-pair gradients.

use ndarray::Array2;
use ordinal_loss::{LabelsView, OrdinalLossEngine, PairsView, ThresholdWeights};
use proptest::collection::vec as prop_vec;
use proptest::prelude::*;

/// A batch with its threshold count, weights, scores and labels.
#[derive(Debug, Clone)]
struct Batch {
    k: usize,
    weights: Vec<f32>,
    scores: Array2<f32>,
    labels: Vec<f32>,
}

fn arb_batch() -> impl Strategy<Value = Batch> {
    (1usize..8, 0usize..12).prop_flat_map(|(k, n)| {
        (
            prop_vec(0.0f32..4.0, k),
            prop_vec(-50.0f32..50.0, n * 2 * k),
            prop_vec(0..=k, n),
        )
            .prop_map(move |(weights, scores, labels)| Batch {
                k,
                weights,
                scores: Array2::from_shape_vec((n, 2 * k), scores).unwrap(),
                labels: labels.into_iter().map(|l| l as f32).collect(),
            })
    })
}

fn engine_for(batch: &Batch) -> OrdinalLossEngine {
    OrdinalLossEngine::new(ThresholdWeights::new(batch.weights.clone()).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Every probability pair is a distribution.
    #[test]
    fn probability_pairs_are_normalized(batch in arb_batch()) {
        let engine = engine_for(&batch);
        let out = engine
            .forward(PairsView::from_array(batch.scores.view()), LabelsView::from_slice(&batch.labels))
            .unwrap();

        for row in out.probabilities.rows() {
            for j in 0..batch.k {
                let (p0, p1) = (row[2 * j], row[2 * j + 1]);
                prop_assert!((0.0..=1.0).contains(&p0), "p0 = {}", p0);
                prop_assert!((0.0..=1.0).contains(&p1), "p1 = {}", p1);
                prop_assert!((p0 + p1 - 1.0).abs() < 1e-6, "pair sums to {}", p0 + p1);
            }
        }
    }

    /// Loss is finite and non-negative.
    #[test]
    fn loss_is_non_negative(batch in arb_batch()) {
        let engine = engine_for(&batch);
        let out = engine
            .forward(PairsView::from_array(batch.scores.view()), LabelsView::from_slice(&batch.labels))
            .unwrap();
        prop_assert!(out.loss.is_finite());
        prop_assert!(out.loss >= 0.0, "loss = {}", out.loss);
    }

    /// Gradient has the score shape and each pair's components cancel.
    #[test]
    fn gradient_pairs_cancel(batch in arb_batch()) {
        let engine = engine_for(&batch);
        let labels = LabelsView::from_slice(&batch.labels);
        let out = engine
            .forward(PairsView::from_array(batch.scores.view()), labels)
            .unwrap();
        let grad = engine
            .backward(PairsView::from_array(out.probabilities.view()), labels)
            .unwrap();

        prop_assert_eq!(grad.dim(), batch.scores.dim());
        for row in grad.rows() {
            for j in 0..batch.k {
                let sum = row[2 * j] + row[2 * j + 1];
                prop_assert!(sum.abs() < 1e-5, "pair {} sums to {}", j, sum);
            }
        }
    }

    /// Zero-weight thresholds contribute no gradient.
    #[test]
    fn zero_weight_threshold_is_inert(batch in arb_batch(), j in 0usize..8) {
        let j = j % batch.k;
        let mut weights = batch.weights.clone();
        weights[j] = 0.0;
        let engine = OrdinalLossEngine::new(ThresholdWeights::new(weights).unwrap());
        let labels = LabelsView::from_slice(&batch.labels);
        let out = engine
            .forward(PairsView::from_array(batch.scores.view()), labels)
            .unwrap();
        let grad = engine
            .backward(PairsView::from_array(out.probabilities.view()), labels)
            .unwrap();

        for row in grad.rows() {
            prop_assert_eq!(row[2 * j], 0.0);
            prop_assert_eq!(row[2 * j + 1], 0.0);
        }
    }
}
