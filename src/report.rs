//! Sweep reports for downstream display.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::layer::Activation;
use crate::sweep::PruningCandidate;

/// One row of the per-layer breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayerSummary {
    /// Position in evaluation order.
    pub index: usize,
    /// Activation of the dense layer.
    pub activation: Activation,
    /// Input neurons.
    pub inputs: usize,
    /// Output neurons.
    pub outputs: usize,
    /// Weight count.
    pub weights: usize,
    /// Bias count.
    pub biases: usize,
}

/// Summary of the selected candidate.
///
/// `Display` renders the text block written next to the saved model:
///
/// ```text
/// Best Model (Greedy Selection):
///   Prune Percentage: 24.00%
///   Accuracy: 0.8912
///   Total Registers: 138
///
/// Layer-wise details for the best model:
/// Layer 0 (Dense, relu): Input Neurons = 16, Output Neurons = 7, Weights = 112, Biases = 7
/// ...
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BestModelReport {
    /// Selected prune ratio.
    pub ratio: f64,
    /// Floating accuracy.
    pub accuracy: f64,
    /// Fixed-point accuracy.
    pub fixed_point_accuracy: f64,
    /// Register count.
    pub registers: usize,
    /// Per-layer breakdown.
    pub layers: Vec<LayerSummary>,
}

impl BestModelReport {
    /// Builds the report for one candidate.
    pub fn new(candidate: &PruningCandidate) -> Self {
        let layers = candidate
            .network
            .layers()
            .iter()
            .enumerate()
            .map(|(index, l)| LayerSummary {
                index,
                activation: l.activation,
                inputs: l.in_dim,
                outputs: l.out_dim,
                weights: l.weight_count(),
                biases: l.bias.len(),
            })
            .collect();
        Self {
            ratio: candidate.metrics.ratio,
            accuracy: candidate.metrics.accuracy,
            fixed_point_accuracy: candidate.metrics.fixed_point_accuracy,
            registers: candidate.metrics.resources.registers,
            layers,
        }
    }
}

impl fmt::Display for BestModelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Best Model (Greedy Selection):")?;
        writeln!(f, "  Prune Percentage: {:.2}%", self.ratio * 100.0)?;
        writeln!(f, "  Accuracy: {:.4}", self.accuracy)?;
        writeln!(f, "  Fixed-Point Accuracy: {:.4}", self.fixed_point_accuracy)?;
        writeln!(f, "  Total Registers: {}", self.registers)?;
        writeln!(f)?;
        writeln!(f, "Layer-wise details for the best model:")?;
        for l in &self.layers {
            writeln!(
                f,
                "Layer {} (Dense, {}): Input Neurons = {}, Output Neurons = {}, Weights = {}, Biases = {}",
                l.index, l.activation, l.inputs, l.outputs, l.weights, l.biases
            )?;
        }
        Ok(())
    }
}

/// Per-ratio metrics as parallel columns, one entry per grid point.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SweepMetrics {
    /// Prune ratios.
    pub prune_ratios: Vec<f64>,
    /// Floating accuracies.
    pub accuracies: Vec<f64>,
    /// Fixed-point accuracies.
    pub fixed_point_accuracies: Vec<f64>,
    /// Model sizes in KiB.
    pub model_sizes_kib: Vec<f64>,
    /// Register counts.
    pub registers: Vec<usize>,
    /// Multiplier counts.
    pub multipliers: Vec<usize>,
    /// Adder counts.
    pub adders: Vec<usize>,
}

impl SweepMetrics {
    /// Collects the columns from candidates in grid order.
    pub fn from_candidates(candidates: &[PruningCandidate]) -> Self {
        let mut m = Self::default();
        for c in candidates {
            let c = &c.metrics;
            m.prune_ratios.push(c.ratio);
            m.accuracies.push(c.accuracy);
            m.fixed_point_accuracies.push(c.fixed_point_accuracy);
            m.model_sizes_kib.push(c.model_size_kib);
            m.registers.push(c.resources.registers);
            m.multipliers.push(c.resources.multipliers);
            m.adders.push(c.resources.adders);
        }
        m
    }

    /// Number of grid points.
    pub fn len(&self) -> usize {
        self.prune_ratios.len()
    }

    /// True when no grid point was measured.
    pub fn is_empty(&self) -> bool {
        self.prune_ratios.is_empty()
    }
}
