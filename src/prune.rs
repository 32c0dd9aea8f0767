//! Structured neuron pruning.
//!
//! Removes whole hidden neurons, ranked by the L1 norm of their incoming
//! weights, and rebuilds a smaller dense network with the surviving weights
//! copied verbatim.
//!
//! # Chaining
//!
//! Dropping output neuron `o` of layer `k` also drops input row `o` of
//! layer `k + 1`. The pass is a fold over the layers carrying the survivor
//! indices of the previous layer:
//!
//! ```text
//! kept_0 = all inputs
//! layer k: W_k[kept_{k-1}, :]  →  rank columns  →  kept_k
//! output : W_out[kept_{n-1}, :] (columns untouched)
//! ```
//!
//! # Example
//!
//! ```rust
//! use hwprune::{prune, Network};
//!
//! let network = Network::random(&[16, 8, 4, 1], 42).unwrap();
//! let pruned = prune::prune(&network, &[2, 1]).unwrap();
//! assert_eq!(pruned.layer_dims(), vec![16, 6, 3, 1]);
//! ```

use crate::error::{PruneError, PruneResult};
use crate::layer::DenseLayer;
use crate::network::Network;

/// Importance of each output neuron: sum of `|w|` over its incoming column.
pub fn neuron_importance(layer: &DenseLayer) -> Vec<f32> {
    let mut importance = vec![0.0f32; layer.out_dim];
    for i in 0..layer.in_dim {
        for (acc, w) in importance.iter_mut().zip(layer.row(i)) {
            *acc += w.abs();
        }
    }
    importance
}

/// Output neuron indices ordered by ascending importance.
///
/// Stable: equal importances keep their original index order, so the
/// ranking is deterministic.
pub fn rank_neurons(importance: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..importance.len()).collect();
    order.sort_by(|&a, &b| importance[a].total_cmp(&importance[b]));
    order
}

/// Indices that survive removing the `remove` least-important neurons,
/// in their original relative order.
pub fn surviving_neurons(layer: &DenseLayer, remove: usize) -> Vec<usize> {
    let ranking = rank_neurons(&neuron_importance(layer));
    let mut kept: Vec<usize> = ranking.into_iter().skip(remove).collect();
    kept.sort_unstable();
    kept
}

/// Restricts a layer to the given input rows.
pub fn select_inputs(layer: &DenseLayer, rows: &[usize]) -> DenseLayer {
    let mut weights = Vec::with_capacity(rows.len() * layer.out_dim);
    for &i in rows {
        weights.extend_from_slice(layer.row(i));
    }
    DenseLayer {
        in_dim: rows.len(),
        out_dim: layer.out_dim,
        weights,
        bias: layer.bias.clone(),
        activation: layer.activation,
    }
}

/// Restricts a layer to the given output columns (and their biases).
pub fn select_outputs(layer: &DenseLayer, cols: &[usize]) -> DenseLayer {
    let mut weights = Vec::with_capacity(layer.in_dim * cols.len());
    for i in 0..layer.in_dim {
        let row = layer.row(i);
        weights.extend(cols.iter().map(|&o| row[o]));
    }
    DenseLayer {
        in_dim: layer.in_dim,
        out_dim: cols.len(),
        weights,
        bias: cols.iter().map(|&o| layer.bias[o]).collect(),
        activation: layer.activation,
    }
}

/// Prunes a single layer's output neurons.
///
/// Returns the reduced layer and the indices of the neurons it kept.
pub fn prune_layer_by_count(layer: &DenseLayer, remove: usize) -> (DenseLayer, Vec<usize>) {
    let kept = surviving_neurons(layer, remove);
    (select_outputs(layer, &kept), kept)
}

/// Removes `remove_counts[k]` neurons from hidden layer `k`.
///
/// The output layer's width never changes.
///
/// # Errors
///
/// - [`PruneError::TooFewLayers`] when the network has no hidden layer
/// - [`PruneError::HiddenLayerMismatch`] when `remove_counts` has the wrong length
/// - [`PruneError::InvalidRemoval`] when a count would empty a layer
pub fn prune(network: &Network, remove_counts: &[usize]) -> PruneResult<Network> {
    let layers = network.layers();
    if layers.len() < 2 {
        return Err(PruneError::TooFewLayers(layers.len()));
    }
    let hidden = &layers[..layers.len() - 1];
    if remove_counts.len() != hidden.len() {
        return Err(PruneError::hidden_layer_mismatch(
            hidden.len(),
            remove_counts.len(),
        ));
    }
    for (k, (layer, &remove)) in hidden.iter().zip(remove_counts).enumerate() {
        if remove >= layer.out_dim {
            return Err(PruneError::invalid_removal(k, remove, layer.out_dim));
        }
    }

    let all_inputs: Vec<usize> = (0..network.input_dim()).collect();
    let (mut rebuilt, kept) = hidden.iter().zip(remove_counts).fold(
        (Vec::with_capacity(layers.len()), all_inputs),
        |(mut acc, kept_prev), (layer, &remove)| {
            let restricted = select_inputs(layer, &kept_prev);
            let (pruned, kept) = prune_layer_by_count(&restricted, remove);
            acc.push(pruned);
            (acc, kept)
        },
    );

    if let Some(output) = layers.last() {
        rebuilt.push(select_inputs(output, &kept));
    }

    Network::new(network.input_dim(), rebuilt)
}

/// Per-hidden-layer removal counts for a prune ratio: `floor(ratio * width)`.
///
/// ```rust
/// use hwprune::{prune::removal_counts, Network};
///
/// let network = Network::random(&[16, 8, 4, 1], 0).unwrap();
/// assert_eq!(removal_counts(&network, 0.26), vec![2, 1]);
/// ```
pub fn removal_counts(network: &Network, ratio: f64) -> Vec<usize> {
    network
        .hidden_layers()
        .iter()
        .map(|l| (ratio * l.out_dim as f64).floor().max(0.0) as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand_network() -> Network {
        // 3 → 4 → 2 → 1; column sums of |w| in layer 0: [0.6, 0.3, 1.5, 0.3]
        let l0 = DenseLayer::new(
            3,
            4,
            vec![
                0.1, 0.1, 0.5, -0.1, //
                0.2, -0.1, 0.5, 0.1, //
                -0.3, 0.1, 0.5, 0.1,
            ],
            vec![1.0, 2.0, 3.0, 4.0],
        )
        .unwrap();
        let l1 = DenseLayer::new(
            4,
            2,
            vec![
                1.0, 10.0, //
                2.0, 20.0, //
                3.0, 30.0, //
                4.0, 40.0,
            ],
            vec![0.5, -0.5],
        )
        .unwrap();
        let l2 = DenseLayer::new(2, 1, vec![7.0, 8.0], vec![0.0]).unwrap();
        Network::new(3, vec![l0, l1, l2]).unwrap()
    }

    #[test]
    fn test_importance() {
        let net = hand_network();
        let imp = neuron_importance(&net.layers()[0]);
        let want = [0.6f32, 0.3, 1.5, 0.3];
        for (a, b) in imp.iter().zip(want) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_rank_is_stable_on_ties() {
        assert_eq!(rank_neurons(&[0.6, 0.3, 1.5, 0.3]), vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_prune_chains_indices() {
        let net = hand_network();
        // Layer 0 drops neurons 1 and 3 (tied lowest): keeps [0, 2]
        // Layer 1 inputs become rows [0, 2]: [[1,10],[3,30]] → importance [4, 40]
        // Removing 1 from layer 1 keeps neuron 1 only.
        let pruned = prune(&net, &[2, 1]).unwrap();
        assert_eq!(pruned.layer_dims(), vec![3, 2, 1, 1]);

        let l0 = &pruned.layers()[0];
        assert_eq!(l0.bias, vec![1.0, 3.0]);
        assert_eq!(l0.row(0), &[0.1, 0.5]);
        assert_eq!(l0.row(2), &[-0.3, 0.5]);

        let l1 = &pruned.layers()[1];
        assert_eq!(l1.weights, vec![10.0, 30.0]);
        assert_eq!(l1.bias, vec![-0.5]);

        let l2 = &pruned.layers()[2];
        assert_eq!(l2.weights, vec![8.0]);
        assert_eq!(l2.bias, vec![0.0]);
    }

    #[test]
    fn test_zero_removal_is_identity() {
        let net = hand_network();
        let pruned = prune(&net, &[0, 0]).unwrap();
        assert_eq!(pruned, net);
    }

    #[test]
    fn test_configuration_errors() {
        let net = hand_network();
        assert!(matches!(
            prune(&net, &[1]),
            Err(PruneError::HiddenLayerMismatch { expected: 2, got: 1 })
        ));
        assert!(matches!(
            prune(&net, &[4, 0]),
            Err(PruneError::InvalidRemoval { layer: 0, .. })
        ));

        let single = Network::random(&[3, 1], 0).unwrap();
        assert!(matches!(prune(&single, &[]), Err(PruneError::TooFewLayers(1))));
    }

    #[test]
    fn test_removal_counts_floor() {
        let net = Network::random(&[16, 8, 4, 1], 0).unwrap();
        assert_eq!(removal_counts(&net, 0.0), vec![0, 0]);
        assert_eq!(removal_counts(&net, 0.24), vec![1, 0]);
        assert_eq!(removal_counts(&net, 0.5), vec![4, 2]);
    }
}
