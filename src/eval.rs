//! Labeled evaluation sets and accuracy evaluators.
//!
//! Two evaluators share one decision rule:
//! - single-unit head: class 1 iff `p >= 0.5`
//! - multi-unit head: `argmax` (first index wins ties)
//!
//! [`FloatEvaluator`] runs the network in `f32` with exact transcendentals;
//! [`FixedPointEvaluator`] runs the integer emulation from [`crate::fixed`].

use crate::error::{PruneError, PruneResult};
use crate::fixed::FixedPointModel;
use crate::network::Network;
use crate::quant::FixedPointCodec;

/// Feature matrix plus integer labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    features: Vec<f32>,
    labels: Vec<u32>,
    n_features: usize,
}

impl Dataset {
    /// Wraps a row-major `[n_samples, n_features]` matrix and its labels.
    ///
    /// # Errors
    ///
    /// - [`PruneError::EmptyDataset`] when there are no samples
    /// - [`PruneError::ShapeMismatch`] when the matrix isn't rectangular
    /// - [`PruneError::LabelCountMismatch`] when label and row counts differ
    pub fn new(features: Vec<f32>, labels: Vec<u32>, n_features: usize) -> PruneResult<Self> {
        if n_features == 0 || features.is_empty() {
            return Err(PruneError::EmptyDataset);
        }
        if features.len() % n_features != 0 {
            return Err(PruneError::shape_mismatch(
                &[features.len() / n_features, n_features],
                &[features.len()],
            ));
        }
        let samples = features.len() / n_features;
        if labels.len() != samples {
            return Err(PruneError::LabelCountMismatch {
                labels: labels.len(),
                samples,
            });
        }
        Ok(Self {
            features,
            labels,
            n_features,
        })
    }

    /// Row-major features.
    #[inline]
    pub fn features(&self) -> &[f32] {
        &self.features
    }

    /// One label per sample.
    #[inline]
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    /// Columns per sample.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Always false for a constructed dataset.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Turns head outputs into class indices.
///
/// `scores` holds `[batch * out_dim]` values.
pub fn decide_classes<T>(scores: &[T], out_dim: usize) -> Vec<u32>
where
    T: Copy + PartialOrd + Into<f64>,
{
    if out_dim <= 1 {
        return scores
            .iter()
            .map(|&p| u32::from(p.into() >= 0.5))
            .collect();
    }
    scores
        .chunks_exact(out_dim)
        .map(|row| {
            let mut best = 0;
            for (k, v) in row.iter().enumerate().skip(1) {
                if *v > row[best] {
                    best = k;
                }
            }
            best as u32
        })
        .collect()
}

/// Fraction of predictions equal to the labels.
pub fn accuracy(predicted: &[u32], labels: &[u32]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let hits = predicted
        .iter()
        .zip(labels)
        .filter(|(p, l)| p == l)
        .count();
    hits as f64 / labels.len() as f64
}

fn check_width(network: &Network, data: &Dataset) -> PruneResult<()> {
    if network.input_dim() != data.n_features() {
        return Err(PruneError::shape_mismatch(
            &[network.input_dim()],
            &[data.n_features()],
        ));
    }
    Ok(())
}

/// Scores a network's classification accuracy on a dataset.
///
/// Implementations must be shareable across the sweep's worker threads.
pub trait Evaluator: Send + Sync {
    /// Accuracy in `[0, 1]`.
    fn accuracy(&self, network: &Network, data: &Dataset) -> PruneResult<f64>;
}

/// Floating-point reference evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatEvaluator;

impl Evaluator for FloatEvaluator {
    fn accuracy(&self, network: &Network, data: &Dataset) -> PruneResult<f64> {
        check_width(network, data)?;
        let scores = network.forward_batch(data.features())?;
        let classes = decide_classes(&scores, network.output_dim());
        Ok(accuracy(&classes, data.labels()))
    }
}

/// Fixed-point emulation evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPointEvaluator {
    codec: FixedPointCodec,
}

impl FixedPointEvaluator {
    /// Evaluator running in Q_`frac_bits`.
    pub fn new(frac_bits: u32) -> Self {
        Self {
            codec: FixedPointCodec::new(frac_bits),
        }
    }

    /// Codec in use.
    pub fn codec(&self) -> FixedPointCodec {
        self.codec
    }
}

impl Evaluator for FixedPointEvaluator {
    fn accuracy(&self, network: &Network, data: &Dataset) -> PruneResult<f64> {
        check_width(network, data)?;
        let model = FixedPointModel::new(network, self.codec);
        let scores = model.predict(data.features())?;
        let classes = decide_classes(&scores, model.output_dim());
        Ok(accuracy(&classes, data.labels()))
    }
}
