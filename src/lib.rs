//! # hwprune - Fixed-Point Emulation and Resource-Aware Pruning
//!
//! Estimates what a small dense classifier costs on fixed-point hardware and
//! searches for a narrower version that keeps accuracy within a tolerance of
//! the best candidate while using the fewest registers.
//!
//! ## Pipeline
//! - [`quant`]: global Q_B codec (floor quantization, real dequantization)
//! - [`lut`]: table-based `exp` for sigmoid / softmax heads
//! - [`fixed`]: integer forward pass (`>> B` rescale, relu in integer domain)
//! - [`prune`]: structured neuron pruning with chained input restriction
//! - [`resources`]: multiplier / adder / register counts from network shape
//! - [`sweep`]: parallel prune-ratio sweep and minimum-register selection
//!
//! ## Weight Layout
//! Row-Major `[in_dim, out_dim]`: row `i` = outgoing weights of input `i`.
//!
//! ## Usage
//! ```rust,ignore
//! use hwprune::{Dataset, Network, SimConfig, Sweep};
//!
//! let network: Network = load_trained_network();
//! let data: Dataset = load_eval_set();
//!
//! let result = Sweep::new(SimConfig::default())?.run(&network, &data)?;
//! println!("{}", result.report());
//! ```

pub mod config;
pub mod error;
pub mod eval;
pub mod fixed;
pub mod layer;
pub mod lut;
pub mod network;
pub mod prune;
pub mod quant;
pub mod report;
pub mod resources;
pub mod sweep;

// Re-exports
pub use config::{ConfigError, SimConfig, SimConfigBuilder, DEFAULT_FRAC_BITS, DEFAULT_TOLERANCE};
pub use error::{PruneError, PruneResult};
pub use eval::{accuracy, decide_classes, Dataset, Evaluator, FixedPointEvaluator, FloatEvaluator};
pub use fixed::FixedPointModel;
pub use layer::{Activation, DenseLayer};
pub use lut::{approx_exp, approx_sigmoid, ExpTables};
pub use network::Network;
pub use quant::{FixedPointCodec, QuantizedTensor};
pub use report::{BestModelReport, LayerSummary, SweepMetrics};
pub use resources::{estimate, ResourceEstimate};
pub use sweep::{select_best, CandidateMetrics, PruningCandidate, Selection, Sweep, SweepResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
