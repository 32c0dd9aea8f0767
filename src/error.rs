//! Unified error types for hwprune.
//!
//! This module provides [`PruneError`], the single error type returned by
//! every fallible operation in the crate. It uses the `thiserror` crate for
//! ergonomic error handling.
//!
//! # Example
//!
//! ```rust
//! use hwprune::PruneError;
//!
//! fn check_widths(expected: &[usize], got: &[usize]) -> Result<(), PruneError> {
//!     if expected != got {
//!         return Err(PruneError::shape_mismatch(expected, got));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::config::ConfigError;

/// Unified error type for hwprune operations.
#[derive(Error, Debug)]
pub enum PruneError {
    /// Invalid simulation configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Shape mismatch between expected and actual tensor shapes.
    ///
    /// Raised when layer widths do not chain, or when inputs don't match the
    /// network's declared feature count.
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape received.
        got: Vec<usize>,
    },

    /// Removal-count list length doesn't match the number of hidden layers.
    #[error("Mismatch between hidden layers and removal list: expected {expected} entries, got {got}")]
    HiddenLayerMismatch {
        /// Number of hidden layers in the network.
        expected: usize,
        /// Number of removal counts supplied.
        got: usize,
    },

    /// Pruning needs at least one hidden layer plus an output layer.
    #[error("Network must include at least one hidden layer and an output layer, got {0} layer(s)")]
    TooFewLayers(usize),

    /// A removal count would leave a hidden layer without neurons.
    #[error("Cannot remove {remove} neuron(s) from hidden layer {layer} of width {width}")]
    InvalidRemoval {
        /// Hidden layer index.
        layer: usize,
        /// Requested removal count.
        remove: usize,
        /// Current width of the layer.
        width: usize,
    },

    /// Evaluation set has no samples.
    #[error("Evaluation dataset is empty")]
    EmptyDataset,

    /// Label vector length differs from the number of feature rows.
    #[error("Label count {labels} does not match sample count {samples}")]
    LabelCountMismatch {
        /// Number of labels.
        labels: usize,
        /// Number of feature rows.
        samples: usize,
    },

    /// Selection found no candidate within tolerance of the best accuracy.
    ///
    /// The best-accuracy candidate always qualifies, so this indicates a
    /// defect (e.g. NaN accuracies) rather than a legitimate outcome.
    #[error("No candidate reached accuracy threshold {threshold} (best accuracy {best})")]
    NoQualifyingCandidate {
        /// Best floating accuracy observed.
        best: f64,
        /// `best - tolerance`.
        threshold: f64,
    },

    /// The sweep produced no candidates at all (empty grid or deadline hit before start).
    #[error("Sweep produced no candidates")]
    EmptySweep,

    /// Model (de)serialization failed.
    #[cfg(feature = "serde")]
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Result type alias for hwprune operations.
pub type PruneResult<T> = Result<T, PruneError>;

impl PruneError {
    /// Creates a shape mismatch error.
    pub fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        PruneError::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Creates a hidden-layer/removal-list mismatch error.
    pub fn hidden_layer_mismatch(expected: usize, got: usize) -> Self {
        PruneError::HiddenLayerMismatch { expected, got }
    }

    /// Creates an invalid removal error.
    pub fn invalid_removal(layer: usize, remove: usize, width: usize) -> Self {
        PruneError::InvalidRemoval {
            layer,
            remove,
            width,
        }
    }

    /// Creates a selection defect error.
    pub fn no_qualifying_candidate(best: f64, threshold: f64) -> Self {
        PruneError::NoQualifyingCandidate { best, threshold }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch() {
        let err = PruneError::shape_mismatch(&[16, 8], &[16, 7]);
        let msg = err.to_string();
        assert!(msg.contains("Shape mismatch"));
        assert!(msg.contains("[16, 8]"));
        assert!(msg.contains("[16, 7]"));
    }

    #[test]
    fn test_hidden_layer_mismatch() {
        let err = PruneError::hidden_layer_mismatch(2, 3);
        let msg = err.to_string();
        assert!(msg.contains("removal list"));
        assert!(msg.contains('2'));
        assert!(msg.contains('3'));
    }

    #[test]
    fn test_config_error() {
        let err: PruneError = ConfigError::InvalidFracBits(0).into();
        assert!(err.to_string().contains("Configuration error"));
    }
}
