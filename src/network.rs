//! Feed-forward dense network.
//!
//! A [`Network`] is an ordered list of [`DenseLayer`]s, evaluated front to
//! back. It is immutable once built: pruning produces a new network rather
//! than editing one in place.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{PruneError, PruneResult};
use crate::layer::{Activation, DenseLayer};

/// Complete dense network.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Network {
    /// Declared feature count.
    input_dim: usize,

    /// Layers: input→hidden[0]→...→hidden[n]→output.
    layers: Vec<DenseLayer>,
}

impl Network {
    /// Builds a network and assigns activations by position.
    ///
    /// Hidden layers get [`Activation::Relu`]; the last layer gets
    /// [`Activation::Sigmoid`] when it has one unit, [`Activation::Softmax`]
    /// otherwise. Any activation already set on the layers is overwritten.
    ///
    /// # Errors
    ///
    /// - [`PruneError::TooFewLayers`] for an empty layer list
    /// - [`PruneError::ShapeMismatch`] when widths don't chain, or a layer's
    ///   weight / bias length disagrees with its declared dimensions
    pub fn new(input_dim: usize, mut layers: Vec<DenseLayer>) -> PruneResult<Self> {
        if layers.is_empty() {
            return Err(PruneError::TooFewLayers(0));
        }

        let mut expected_in = input_dim;
        for layer in &layers {
            if layer.in_dim != expected_in {
                return Err(PruneError::shape_mismatch(
                    &[expected_in, layer.out_dim],
                    &[layer.in_dim, layer.out_dim],
                ));
            }
            if layer.weights.len() != layer.in_dim * layer.out_dim {
                return Err(PruneError::shape_mismatch(
                    &[layer.in_dim * layer.out_dim],
                    &[layer.weights.len()],
                ));
            }
            if layer.bias.len() != layer.out_dim {
                return Err(PruneError::shape_mismatch(
                    &[layer.out_dim],
                    &[layer.bias.len()],
                ));
            }
            expected_in = layer.out_dim;
        }

        let last = layers.len() - 1;
        for (idx, layer) in layers.iter_mut().enumerate() {
            layer.activation = Activation::for_position(idx == last, layer.out_dim);
        }

        Ok(Self { input_dim, layers })
    }

    /// Creates a network with Xavier-uniform weights from a fixed seed.
    ///
    /// `dims` lists every width, input first: `[16, 8, 4, 1]` builds three
    /// layers `16→8`, `8→4`, `4→1`.
    ///
    /// # Errors
    ///
    /// [`PruneError::TooFewLayers`] if `dims` has fewer than two entries, or
    /// [`PruneError::ShapeMismatch`] if any width is zero.
    pub fn random(dims: &[usize], seed: u64) -> PruneResult<Self> {
        if dims.len() < 2 {
            return Err(PruneError::TooFewLayers(dims.len().saturating_sub(1)));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let mut layers = Vec::with_capacity(dims.len() - 1);
        for pair in dims.windows(2) {
            let (in_dim, out_dim) = (pair[0], pair[1]);
            let limit = (6.0 / (in_dim + out_dim).max(1) as f32).sqrt();
            let weights = (0..in_dim * out_dim)
                .map(|_| rng.gen_range(-limit..limit))
                .collect();
            let bias = (0..out_dim).map(|_| rng.gen_range(-0.1..0.1)).collect();
            layers.push(DenseLayer::new(in_dim, out_dim, weights, bias)?);
        }
        Self::new(dims[0], layers)
    }

    /// Declared feature count.
    #[inline]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Width of the classification head.
    #[inline]
    pub fn output_dim(&self) -> usize {
        self.layers.last().map_or(0, |l| l.out_dim)
    }

    /// Returns the number of layers.
    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// All layers in evaluation order.
    #[inline]
    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    /// Layers other than the output layer.
    #[inline]
    pub fn hidden_layers(&self) -> &[DenseLayer] {
        &self.layers[..self.layers.len() - 1]
    }

    /// Consumes the network, returning its layers.
    pub fn into_layers(self) -> Vec<DenseLayer> {
        self.layers
    }

    /// Returns all layer dimensions: `[input, hidden..., output]`.
    pub fn layer_dims(&self) -> Vec<usize> {
        let mut dims = Vec::with_capacity(self.layers.len() + 1);
        dims.push(self.input_dim);
        dims.extend(self.layers.iter().map(|l| l.out_dim));
        dims
    }

    /// Returns total number of parameters (weights + biases).
    pub fn param_count(&self) -> usize {
        self.layers.iter().map(DenseLayer::param_count).sum()
    }

    /// Floating-point forward pass for one sample.
    pub fn forward_single(&self, input: &[f32]) -> Vec<f32> {
        debug_assert_eq!(input.len(), self.input_dim);
        let mut current = input.to_vec();
        let mut next = Vec::new();
        for layer in &self.layers {
            next.clear();
            next.resize(layer.out_dim, 0.0);
            layer.forward_single(&current, &mut next);
            std::mem::swap(&mut current, &mut next);
        }
        current
    }

    /// Floating-point forward pass for a batch.
    ///
    /// # Arguments
    /// * `input` - Input batch `[batch_size * input_dim]`, Row-Major
    ///
    /// # Returns
    /// Output batch `[batch_size * output_dim]`.
    ///
    /// # Errors
    ///
    /// [`PruneError::ShapeMismatch`] if `input.len()` isn't a multiple of `input_dim`.
    pub fn forward_batch(&self, input: &[f32]) -> PruneResult<Vec<f32>> {
        if input.len() % self.input_dim != 0 {
            return Err(PruneError::shape_mismatch(
                &[input.len() / self.input_dim * self.input_dim],
                &[input.len()],
            ));
        }
        let batch_size = input.len() / self.input_dim;
        let out_dim = self.output_dim();
        let mut output = Vec::with_capacity(batch_size * out_dim);
        for sample in input.chunks_exact(self.input_dim) {
            output.extend(self.forward_single(sample));
        }
        Ok(output)
    }

    /// Saves network to bytes using bincode.
    #[cfg(feature = "serde")]
    pub fn to_bytes(&self) -> PruneResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Loads network from bytes, re-checking that layer widths chain.
    #[cfg(feature = "serde")]
    pub fn from_bytes(bytes: &[u8]) -> PruneResult<Self> {
        let raw: Self = bincode::deserialize(bytes)?;
        Self::new(raw.input_dim, raw.layers)
    }

    /// Estimated stored model size in KiB.
    ///
    /// With the `serde` feature this is the exact bincode size; without it,
    /// four bytes per parameter plus two `u64` dimensions and an activation
    /// tag per layer.
    pub fn model_size_kib(&self) -> f64 {
        #[cfg(feature = "serde")]
        {
            if let Ok(len) = bincode::serialized_size(self) {
                return len as f64 / 1024.0;
            }
        }
        let header = 8 + 8; // input_dim + layer count
        let per_layer: usize = self
            .layers
            .iter()
            .map(|l| 2 * 8 + 4 + 2 * 8 + 4 * l.param_count())
            .sum();
        (header + per_layer) as f64 / 1024.0
    }
}
