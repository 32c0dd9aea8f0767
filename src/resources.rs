//! Hardware resource estimation.
//!
//! A closed-form count of the units a fully-unrolled dense network needs.
//! For a layer with `i` inputs and `o` outputs:
//!
//! | Unit | Per layer |
//! |------|-----------|
//! | multipliers | `i·o` |
//! | adders | `i·o + o` (accumulation plus bias) |
//! | registers | `i·o + o` (weight plus bias storage) |
//!
//! Registers additionally get one shared activation buffer sized to the
//! widest layer output, reused by every layer.
//!
//! The second half of the module models neuron *primitives*: hardware blocks
//! that evaluate `n` neurons over `F` features with a shared input register
//! bank, used to compare per-neuron cost and pipeline latency across
//! primitive sizes.

use std::ops::Add;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::network::Network;

/// Unit counts for one network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResourceEstimate {
    /// Multiplier units.
    pub multipliers: usize,
    /// Adder units.
    pub adders: usize,
    /// Registers (parameters plus activation buffer).
    pub registers: usize,
}

impl ResourceEstimate {
    /// Sum of all units.
    pub fn total(&self) -> usize {
        self.multipliers + self.adders + self.registers
    }
}

impl Add for ResourceEstimate {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            multipliers: self.multipliers + rhs.multipliers,
            adders: self.adders + rhs.adders,
            registers: self.registers + rhs.registers,
        }
    }
}

/// Cost of one `in_dim → out_dim` dense layer, without the shared buffer.
#[inline]
pub fn layer_cost(in_dim: usize, out_dim: usize) -> ResourceEstimate {
    let products = in_dim * out_dim;
    ResourceEstimate {
        multipliers: products,
        adders: products + out_dim,
        registers: products + out_dim,
    }
}

/// Estimates the resources of `network`.
///
/// ```rust
/// use hwprune::{resources::estimate, Network};
///
/// let network = Network::random(&[16, 6, 3, 1], 0).unwrap();
/// let est = estimate(&network);
/// assert_eq!(est.multipliers, 16 * 6 + 6 * 3 + 3 * 1);
/// ```
pub fn estimate(network: &Network) -> ResourceEstimate {
    estimate_dims(&network.layer_dims())
}

/// Same as [`estimate`], from a width list `[input, hidden..., output]`.
pub fn estimate_dims(dims: &[usize]) -> ResourceEstimate {
    let mut total = dims
        .windows(2)
        .map(|w| layer_cost(w[0], w[1]))
        .fold(ResourceEstimate::default(), Add::add);
    total.registers += dims.iter().skip(1).copied().max().unwrap_or(0);
    total
}

/// Input registers shared by every neuron of a primitive, per feature.
pub const SHARED_REGS_PER_FEATURE: f64 = 1.0;

/// Per-neuron cost of a two-neuron primitive relative to a single neuron at `F = 1`.
pub const TARGET_RELATIVE_RESOURCE_AT_F1: f64 = 0.92;

/// Fixed pipeline depth before the adder tree.
pub const BASE_PIPELINE_CYCLES: usize = 6;

/// Private (per-neuron) register factor, solved from
/// `((shared + 2·private) / 2) / (shared + private) = r` at `F = 1`.
pub fn private_reg_factor() -> f64 {
    let r = TARGET_RELATIVE_RESOURCE_AT_F1;
    SHARED_REGS_PER_FEATURE * ((2.0 * r - 1.0) / (2.0 * (1.0 - r)))
}

/// Resource cost per neuron for a primitive holding `num_neurons` neurons
/// over `feature_size` features.
///
/// Returns `f64::INFINITY` for an empty primitive.
pub fn per_neuron_resource_cost(num_neurons: usize, feature_size: usize) -> f64 {
    if num_neurons == 0 {
        return f64::INFINITY;
    }
    let f = feature_size as f64;
    let shared = SHARED_REGS_PER_FEATURE * f;
    let private = private_reg_factor() * f * f;
    (shared + num_neurons as f64 * private) / num_neurons as f64
}

/// Per-neuron cost of each primitive size, normalized to the single-neuron
/// primitive, for every feature size.
///
/// Output is indexed `[primitive][feature]`.
pub fn relative_resource_curves(primitives: &[usize], feature_sizes: &[usize]) -> Vec<Vec<f64>> {
    primitives
        .iter()
        .map(|&n| {
            feature_sizes
                .iter()
                .map(|&f| per_neuron_resource_cost(n, f) / per_neuron_resource_cost(1, f))
                .collect()
        })
        .collect()
}

/// Latency of one primitive evaluation: base pipeline plus adder-tree depth.
///
/// ```rust
/// use hwprune::resources::cycles_for_feature_size;
///
/// assert_eq!(cycles_for_feature_size(1), 7);
/// assert_eq!(cycles_for_feature_size(7), 9);
/// ```
pub fn cycles_for_feature_size(feature_size: usize) -> usize {
    let depth = ((feature_size + 1) as f64).log2().ceil() as usize;
    BASE_PIPELINE_CYCLES + depth.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_cost() {
        let c = layer_cost(16, 8);
        assert_eq!(c.multipliers, 128);
        assert_eq!(c.adders, 136);
        assert_eq!(c.registers, 136);
    }

    #[test]
    fn test_estimate_dims() {
        // 16→8→4→1
        let est = estimate_dims(&[16, 8, 4, 1]);
        assert_eq!(est.multipliers, 128 + 32 + 4);
        assert_eq!(est.adders, 136 + 36 + 5);
        // + widest output (8) for the shared activation buffer
        assert_eq!(est.registers, 136 + 36 + 5 + 8);
        assert_eq!(est.total(), 164 + 177 + 185);
    }

    #[test]
    fn test_buffer_ignores_input_width() {
        // input width 100 is wider than any layer output but isn't buffered
        let est = estimate_dims(&[100, 2, 1]);
        assert_eq!(est.registers, (200 + 2) + (2 + 1) + 2);
    }

    #[test]
    fn test_private_factor() {
        // r = 0.92 → (0.84) / (0.16) = 5.25
        assert!((private_reg_factor() - 5.25).abs() < 1e-12);
    }

    #[test]
    fn test_relative_curves() {
        let curves = relative_resource_curves(&[1, 2, 3], &[1, 2, 5, 10]);
        assert!(curves[0].iter().all(|&v| (v - 1.0).abs() < 1e-12));
        // Two neurons at F=1 hit the calibration target
        assert!((curves[1][0] - TARGET_RELATIVE_RESOURCE_AT_F1).abs() < 1e-12);
        // Sharing helps more with more neurons, less with wider features
        assert!(curves[2][0] < curves[1][0]);
        assert!(curves[1][3] > curves[1][0]);
        assert!(curves[1].iter().all(|&v| v <= 1.0));
    }

    #[test]
    fn test_cycles() {
        assert_eq!(cycles_for_feature_size(0), 7);
        assert_eq!(cycles_for_feature_size(3), 8);
        assert_eq!(cycles_for_feature_size(4), 9);
        assert_eq!(cycles_for_feature_size(10), 10);
    }
}
