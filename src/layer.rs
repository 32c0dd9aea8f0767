//! Dense layer and activation kinds.
//!
//! # Weight Layout (Critical!)
//!
//! Weights are stored row-major as `[in_dim, out_dim]`: row `i` holds the
//! outgoing weights of input `i`, column `o` holds the incoming weights of
//! output neuron `o`.
//!
//! - `weights[i * out_dim + o]` connects input `i` to output `o`
//! - A forward pass is `y = x · W + b`
//! - Removing output neuron `o` drops column `o` (and `bias[o]`)
//! - Removing input `i` drops row `i`
//!
//! This is the orientation used by the pruning engine and the fixed-point
//! engine alike.

use std::fmt;

use wide::f32x8;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{PruneError, PruneResult};

/// Activation applied after the affine step.
///
/// The set is closed: hidden layers use [`Activation::Relu`], the output
/// layer uses [`Activation::Sigmoid`] for a single unit and
/// [`Activation::Softmax`] otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Activation {
    /// `max(0, x)`.
    Relu,
    /// `1 / (1 + exp(-x))`, binary head.
    Sigmoid,
    /// Row-normalized exponentials, multi-class head.
    Softmax,
}

impl Activation {
    /// Activation chosen for a layer at the given position.
    ///
    /// ```rust
    /// use hwprune::Activation;
    ///
    /// assert_eq!(Activation::for_position(false, 8), Activation::Relu);
    /// assert_eq!(Activation::for_position(true, 1), Activation::Sigmoid);
    /// assert_eq!(Activation::for_position(true, 3), Activation::Softmax);
    /// ```
    pub fn for_position(is_output: bool, out_dim: usize) -> Self {
        match (is_output, out_dim) {
            (false, _) => Activation::Relu,
            (true, 1) => Activation::Sigmoid,
            (true, _) => Activation::Softmax,
        }
    }

    /// Lower-case name, as used in reports.
    pub fn name(&self) -> &'static str {
        match self {
            Activation::Relu => "relu",
            Activation::Sigmoid => "sigmoid",
            Activation::Softmax => "softmax",
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fully-connected layer: `activation(x · W + b)`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DenseLayer {
    /// Input dimension
    pub in_dim: usize,
    /// Output dimension
    pub out_dim: usize,
    /// Weights: `[in_dim][out_dim]`, flat row-major
    pub weights: Vec<f32>,
    /// Bias per output neuron
    pub bias: Vec<f32>,
    /// Activation, assigned by the owning network
    pub activation: Activation,
}

impl DenseLayer {
    /// Creates a layer from row-major `[in_dim, out_dim]` weights.
    ///
    /// The activation defaults to [`Activation::Relu`];
    /// [`Network::new`](crate::Network::new) reassigns it from the layer's
    /// position.
    ///
    /// # Errors
    ///
    /// [`PruneError::ShapeMismatch`] if a dimension is zero or the weight /
    /// bias lengths don't match.
    pub fn new(
        in_dim: usize,
        out_dim: usize,
        weights: Vec<f32>,
        bias: Vec<f32>,
    ) -> PruneResult<Self> {
        if in_dim == 0 || out_dim == 0 {
            return Err(PruneError::shape_mismatch(&[1, 1], &[in_dim, out_dim]));
        }
        if weights.len() != in_dim * out_dim {
            return Err(PruneError::shape_mismatch(
                &[in_dim * out_dim],
                &[weights.len()],
            ));
        }
        if bias.len() != out_dim {
            return Err(PruneError::shape_mismatch(&[out_dim], &[bias.len()]));
        }
        Ok(Self {
            in_dim,
            out_dim,
            weights,
            bias,
            activation: Activation::Relu,
        })
    }

    /// Weight connecting input `i` to output `o`.
    #[inline]
    pub fn weight(&self, i: usize, o: usize) -> f32 {
        self.weights[i * self.out_dim + o]
    }

    /// Outgoing weights of input `i` (one row).
    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        &self.weights[i * self.out_dim..(i + 1) * self.out_dim]
    }

    /// Number of weights.
    #[inline]
    pub fn weight_count(&self) -> usize {
        self.in_dim * self.out_dim
    }

    /// Weights plus biases.
    #[inline]
    pub fn param_count(&self) -> usize {
        self.weight_count() + self.out_dim
    }

    /// Affine step for one sample: `out = x · W + b`, before activation.
    ///
    /// Accumulates row by row (`out += x[i] * W[i, :]`) so the inner loop is
    /// contiguous over outputs and vectorized eight lanes at a time.
    pub fn affine_single(&self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), self.in_dim);
        debug_assert_eq!(output.len(), self.out_dim);

        output.copy_from_slice(&self.bias);

        let chunks = self.out_dim / 8;
        for (i, &x) in input.iter().enumerate() {
            if x == 0.0 {
                continue;
            }
            let row = self.row(i);
            let xv = f32x8::splat(x);
            for c in 0..chunks {
                let base = c * 8;
                let mut w_arr = [0.0f32; 8];
                w_arr.copy_from_slice(&row[base..base + 8]);
                let mut o_arr = [0.0f32; 8];
                o_arr.copy_from_slice(&output[base..base + 8]);
                let acc = f32x8::new(o_arr) + xv * f32x8::new(w_arr);
                output[base..base + 8].copy_from_slice(&acc.to_array());
            }
            // Scalar tail
            for o in chunks * 8..self.out_dim {
                output[o] += x * row[o];
            }
        }
    }

    /// Applies the layer's activation in place on one sample, using `f32::exp`.
    pub fn activate_single(&self, values: &mut [f32]) {
        match self.activation {
            Activation::Relu => {
                for v in values.iter_mut() {
                    *v = v.max(0.0);
                }
            }
            Activation::Sigmoid => {
                for v in values.iter_mut() {
                    *v = 1.0 / (1.0 + (-*v).exp());
                }
            }
            Activation::Softmax => {
                let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                let mut sum = 0.0f32;
                for v in values.iter_mut() {
                    *v = (*v - max).exp();
                    sum += *v;
                }
                if sum > 0.0 {
                    for v in values.iter_mut() {
                        *v /= sum;
                    }
                }
            }
        }
    }

    /// Full forward step for one sample.
    pub fn forward_single(&self, input: &[f32], output: &mut [f32]) {
        self.affine_single(input, output);
        self.activate_single(output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer_2x3() -> DenseLayer {
        // rows = inputs, cols = outputs
        DenseLayer::new(
            2,
            3,
            vec![
                1.0, 2.0, 3.0, //
                -1.0, 0.5, 0.0,
            ],
            vec![0.1, 0.2, 0.3],
        )
        .unwrap()
    }

    #[test]
    fn test_orientation() {
        let layer = layer_2x3();
        assert_eq!(layer.weight(0, 2), 3.0);
        assert_eq!(layer.weight(1, 0), -1.0);
        assert_eq!(layer.row(1), &[-1.0, 0.5, 0.0]);
        assert_eq!(layer.param_count(), 9);
    }

    #[test]
    fn test_affine() {
        let layer = layer_2x3();
        let mut out = [0.0f32; 3];
        layer.affine_single(&[2.0, 1.0], &mut out);
        for (got, want) in out.iter().zip([1.1f32, 4.7, 6.3]) {
            assert!((got - want).abs() < 1e-6, "{} vs {}", got, want);
        }
    }

    #[test]
    fn test_affine_simd_matches_scalar() {
        // out_dim = 11 exercises one 8-lane chunk plus a 3-element tail
        let in_dim = 5;
        let out_dim = 11;
        let weights: Vec<f32> = (0..in_dim * out_dim)
            .map(|k| ((k * 7 % 13) as f32 - 6.0) * 0.1)
            .collect();
        let bias: Vec<f32> = (0..out_dim).map(|o| o as f32 * 0.01).collect();
        let layer = DenseLayer::new(in_dim, out_dim, weights, bias).unwrap();
        let input = [0.3f32, -0.7, 1.1, 0.0, 2.0];

        let mut simd = vec![0.0f32; out_dim];
        layer.affine_single(&input, &mut simd);

        for o in 0..out_dim {
            let mut s = layer.bias[o];
            for (i, &x) in input.iter().enumerate() {
                s += x * layer.weight(i, o);
            }
            assert!((s - simd[o]).abs() < 1e-5, "output {}: {} vs {}", o, s, simd[o]);
        }
    }

    #[test]
    fn test_shape_validation() {
        assert!(DenseLayer::new(2, 3, vec![0.0; 5], vec![0.0; 3]).is_err());
        assert!(DenseLayer::new(2, 3, vec![0.0; 6], vec![0.0; 2]).is_err());
        assert!(DenseLayer::new(0, 3, vec![], vec![0.0; 3]).is_err());
    }

    #[test]
    fn test_softmax_activation() {
        let mut layer = layer_2x3();
        layer.activation = Activation::Softmax;
        let mut v = [1.0f32, 2.0, 3.0];
        layer.activate_single(&mut v);
        let sum: f32 = v.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }
}
