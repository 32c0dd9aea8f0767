//! Fixed-point forward inference.
//!
//! Emulates a dense network on integer hardware. For each layer:
//!
//! 1. `acc = x_q · W_q` in an `i128` accumulator (2B fractional bits)
//! 2. `acc >> B` back to Q_B (floor, not round), narrowed to `i64`
//! 3. `+ b_q`
//! 4. activation: relu in the integer domain; sigmoid / softmax through the
//!    table exponential after dequantizing, then requantized
//!
//! After the last layer the output is dequantized. A single-unit head yields
//! one probability per sample; a multi-unit head is renormalized so each row
//! sums to 1, absorbing truncation drift.
//!
//! # Overflow
//!
//! Storage is `i64` and products accumulate in `i128`, so a layer only wraps
//! when a pre-activation exceeds `2^(63-B)` in real magnitude (about 1.4e14
//! at B = 16). Wrapped values are not saturated; the pass logs a warning.

use crate::error::{PruneError, PruneResult};
use crate::layer::{Activation, DenseLayer};
use crate::lut::{approx_sigmoid, approx_softmax_row};
use crate::network::Network;
use crate::quant::{FixedPointCodec, QuantizedTensor};

/// Network weights quantized once for repeated fixed-point passes.
#[derive(Debug, Clone)]
pub struct FixedPointModel {
    codec: FixedPointCodec,
    layers: Vec<QuantizedLayer>,
    input_dim: usize,
}

#[derive(Debug, Clone)]
struct QuantizedLayer {
    weights: QuantizedTensor,
    bias: Vec<i64>,
    activation: Activation,
}

impl QuantizedLayer {
    fn from_dense(layer: &DenseLayer, codec: &FixedPointCodec) -> Self {
        Self {
            weights: codec.quantize(&layer.weights, layer.in_dim, layer.out_dim),
            bias: codec.quantize_vec(&layer.bias),
            activation: layer.activation,
        }
    }

    fn out_dim(&self) -> usize {
        self.weights.cols()
    }

    /// One dense step on a `[batch, in_dim]` tensor.
    fn forward(
        &self,
        input: &QuantizedTensor,
        codec: &FixedPointCodec,
        overflowed: &mut bool,
    ) -> QuantizedTensor {
        let batch = input.rows();
        let in_dim = self.weights.rows();
        let out_dim = self.out_dim();
        let w = self.weights.data();

        let mut output = QuantizedTensor::zeros(batch, out_dim);
        let mut acc = vec![0i128; out_dim];

        for b in 0..batch {
            acc.iter_mut().for_each(|a| *a = 0);
            for (i, &x) in input.row(b).iter().enumerate().take(in_dim) {
                if x == 0 {
                    continue;
                }
                let x = x as i128;
                let row = &w[i * out_dim..(i + 1) * out_dim];
                for (a, &wv) in acc.iter_mut().zip(row) {
                    *a += x * wv as i128;
                }
            }

            let out_row = &mut output.data_mut()[b * out_dim..(b + 1) * out_dim];
            for ((o, &a), &bias) in out_row.iter_mut().zip(&acc).zip(&self.bias) {
                *o = codec.rescale_product(a, overflowed).wrapping_add(bias);
            }
            self.activate(out_row, codec);
        }

        output
    }

    fn activate(&self, row: &mut [i64], codec: &FixedPointCodec) {
        match self.activation {
            Activation::Relu => {
                for v in row.iter_mut() {
                    *v = (*v).max(0);
                }
            }
            Activation::Sigmoid => {
                for v in row.iter_mut() {
                    let x = codec.dequantize_scalar(*v);
                    *v = codec.quantize_scalar(approx_sigmoid(x));
                }
            }
            Activation::Softmax => {
                let mut real: Vec<f64> = row.iter().map(|&v| codec.dequantize_scalar(v)).collect();
                approx_softmax_row(&mut real);
                for (v, r) in row.iter_mut().zip(real) {
                    *v = codec.quantize_scalar(r);
                }
            }
        }
    }
}

impl FixedPointModel {
    /// Quantizes every layer of `network` with `codec`.
    pub fn new(network: &Network, codec: FixedPointCodec) -> Self {
        let layers = network
            .layers()
            .iter()
            .map(|l| QuantizedLayer::from_dense(l, &codec))
            .collect();
        Self {
            codec,
            layers,
            input_dim: network.input_dim(),
        }
    }

    /// Codec shared by all tensors of this model.
    pub fn codec(&self) -> &FixedPointCodec {
        &self.codec
    }

    /// Width of the classification head.
    pub fn output_dim(&self) -> usize {
        self.layers.last().map_or(0, QuantizedLayer::out_dim)
    }

    /// Runs the integer pipeline on an already-quantized `[batch, input_dim]` tensor.
    ///
    /// # Errors
    ///
    /// [`PruneError::ShapeMismatch`] if the input width differs from the
    /// network's feature count.
    pub fn infer(&self, input: &QuantizedTensor) -> PruneResult<QuantizedTensor> {
        if input.cols() != self.input_dim {
            return Err(PruneError::shape_mismatch(
                &[input.rows(), self.input_dim],
                &[input.rows(), input.cols()],
            ));
        }

        let mut overflowed = false;
        let mut current = input.clone();
        for layer in &self.layers {
            current = layer.forward(&current, &self.codec, &mut overflowed);
        }

        if overflowed {
            log::warn!(
                "fixed-point accumulator exceeded i64 after >> {} bits; values wrapped",
                self.codec.frac_bits()
            );
        }
        Ok(current)
    }

    /// Full fixed-point prediction from real features.
    ///
    /// # Arguments
    /// * `features` - `[batch_size * input_dim]`, Row-Major
    ///
    /// # Returns
    /// `[batch_size]` probabilities for a single-unit head, otherwise
    /// `[batch_size * output_dim]` rows that each sum to 1.
    pub fn predict(&self, features: &[f32]) -> PruneResult<Vec<f64>> {
        if features.len() % self.input_dim != 0 {
            return Err(PruneError::shape_mismatch(
                &[features.len() / self.input_dim * self.input_dim],
                &[features.len()],
            ));
        }
        let batch = features.len() / self.input_dim;
        let input = self.codec.quantize(features, batch, self.input_dim);
        let output = self.infer(&input)?;
        let out_dim = output.cols();
        let mut real = self.codec.dequantize(&output);

        if out_dim > 1 {
            for row in real.chunks_exact_mut(out_dim) {
                let sum: f64 = row.iter().sum();
                if sum != 0.0 {
                    row.iter_mut().for_each(|v| *v /= sum);
                }
            }
        }
        Ok(real)
    }
}

/// One-shot fixed-point inference: quantizes `network` and runs `input`.
///
/// ```rust
/// use hwprune::{fixed, FixedPointCodec, Network};
///
/// let network = Network::random(&[4, 3, 1], 5).unwrap();
/// let codec = FixedPointCodec::new(16);
/// let x = codec.quantize(&[0.1f32, 0.2, 0.3, 0.4], 1, 4);
/// let y = fixed::infer(&network, &x, codec).unwrap();
/// assert_eq!((y.rows(), y.cols()), (1, 1));
/// ```
pub fn infer(
    network: &Network,
    input: &QuantizedTensor,
    codec: FixedPointCodec,
) -> PruneResult<QuantizedTensor> {
    FixedPointModel::new(network, codec).infer(input)
}

/// One-shot fixed-point prediction from real features.
pub fn predict(network: &Network, features: &[f32], codec: FixedPointCodec) -> PruneResult<Vec<f64>> {
    FixedPointModel::new(network, codec).predict(features)
}
