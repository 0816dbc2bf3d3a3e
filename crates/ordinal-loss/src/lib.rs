//! ordinal-loss: weighted ordinal regression loss for Rust.
//!
//! An ordinal label `L ∈ [0, K]` (age group, severity level, ...) is split
//! into `K` binary "above threshold `j`?" decisions. Each decision is scored
//! by a pair of raw logits, normalized with a two-way softmax, and trained
//! with weighted binary cross-entropy.
//!
//! # Key Types
//!
//! - [`OrdinalLossEngine`] - Forward (loss + probabilities) and backward (gradient)
//! - [`OrdinalLossConfig`] - Configuration builder, resolves into an engine
//! - [`OrdinalLossLayer`] - Stateful wrapper retaining forward probabilities
//! - [`ThresholdWeights`] - Per-threshold weights, optionally loaded from a file
//! - [`PairsView`] / [`LabelsView`] - Views over caller-owned batch buffers
//!
//! # Layout
//!
//! Score, probability and gradient buffers are row-major `[N, 2K]`; columns
//! `2j` and `2j + 1` hold the "below" and "above" entries of threshold `j`.

// Re-export approx traits for users who want to compare losses and gradients
pub use approx;

pub mod config;
pub mod engine;
pub mod error;
pub mod layer;
pub mod testing;
pub mod threshold;
pub mod utils;
pub mod views;
pub mod weights;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use config::{ConfigError, OrdinalLossConfig};
pub use engine::{ForwardOutput, OrdinalLossEngine};
pub use error::LossError;
pub use layer::{LayerSetupError, OrdinalLossLayer, PropagateDown};
pub use threshold::{PROB_FLOOR, ThresholdSide, pair_softmax};
pub use utils::{Parallelism, run_with_threads};
pub use views::{LabelsView, PairsView};
pub use weights::{ThresholdWeights, WeightError};
