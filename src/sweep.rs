//! Prune-ratio sweep and candidate selection.
//!
//! For every ratio in the configured grid the sweep:
//!
//! 1. derives per-hidden-layer removal counts `floor(ratio * width)`
//! 2. prunes the baseline network
//! 3. measures floating and fixed-point accuracy
//! 4. estimates hardware resources
//!
//! Grid points are independent and run on the rayon pool; results come back
//! in grid order. Selection then keeps every candidate within `tolerance`
//! of the best floating accuracy and picks the one with the fewest
//! registers, the earliest ratio winning ties.
//!
//! # Example
//!
//! ```rust
//! use hwprune::{Dataset, Network, SimConfig, Sweep};
//!
//! let network = Network::random(&[4, 8, 4, 1], 3).unwrap();
//! let data = Dataset::new(vec![0.5; 4 * 10], vec![1; 10], 4).unwrap();
//! let config = SimConfig::builder().prune_grid(0.0, 0.5, 0.25).build().unwrap();
//!
//! let result = Sweep::new(config).unwrap().run(&network, &data).unwrap();
//! assert_eq!(result.candidates().len(), 3);
//! println!("{}", result.report());
//! ```

use std::time::Instant;

use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::error::{PruneError, PruneResult};
use crate::eval::{Dataset, Evaluator, FixedPointEvaluator, FloatEvaluator};
use crate::network::Network;
use crate::prune::{prune, removal_counts};
use crate::report::{BestModelReport, SweepMetrics};
use crate::resources::{estimate, ResourceEstimate};

/// Slack on the threshold comparison so that accuracies which are exact
/// ratios `k / n` are not lost to rounding in `best - tolerance`.
pub const ACCURACY_EPSILON: f64 = 1e-12;

/// Metrics measured for one grid point.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CandidateMetrics {
    /// Prune ratio of this grid point.
    pub ratio: f64,
    /// Neurons removed from each hidden layer.
    pub removed: Vec<usize>,
    /// Floating-point accuracy.
    pub accuracy: f64,
    /// Fixed-point emulation accuracy.
    pub fixed_point_accuracy: f64,
    /// Stored model size in KiB.
    pub model_size_kib: f64,
    /// Hardware unit counts.
    pub resources: ResourceEstimate,
}

/// A pruned network together with its metrics.
#[derive(Debug, Clone)]
pub struct PruningCandidate {
    /// Measured metrics.
    pub metrics: CandidateMetrics,
    /// The pruned network.
    pub network: Network,
}

/// Outcome of [`select_best`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    /// Index of the selected candidate.
    pub index: usize,
    /// Maximum floating accuracy over all candidates.
    pub best_accuracy: f64,
    /// `best_accuracy - tolerance`.
    pub threshold: f64,
}

/// Picks the minimum-register candidate within `tolerance` of the best accuracy.
///
/// `points` holds `(accuracy, registers)` in grid order; ties on registers
/// go to the earliest point.
///
/// # Errors
///
/// - [`PruneError::EmptySweep`] for no points
/// - [`PruneError::NoQualifyingCandidate`] if nothing meets the threshold,
///   which only happens with non-finite accuracies
///
/// ```rust
/// use hwprune::sweep::select_best;
///
/// let points = [(0.80, 50), (0.81, 40), (0.79, 30), (0.90, 35), (0.89, 20)];
/// let sel = select_best(&points, 0.01).unwrap();
/// assert_eq!(sel.index, 4);
/// ```
pub fn select_best(points: &[(f64, usize)], tolerance: f64) -> PruneResult<Selection> {
    if points.is_empty() {
        return Err(PruneError::EmptySweep);
    }
    let best_accuracy = points
        .iter()
        .map(|&(acc, _)| acc)
        .fold(f64::NEG_INFINITY, f64::max);
    let threshold = best_accuracy - tolerance;

    let mut chosen: Option<(usize, usize)> = None;
    for (idx, &(acc, regs)) in points.iter().enumerate() {
        if acc + ACCURACY_EPSILON < threshold || acc.is_nan() {
            continue;
        }
        match chosen {
            Some((_, best_regs)) if regs >= best_regs => {}
            _ => chosen = Some((idx, regs)),
        }
    }

    match chosen {
        Some((index, _)) => Ok(Selection {
            index,
            best_accuracy,
            threshold,
        }),
        None => Err(PruneError::no_qualifying_candidate(best_accuracy, threshold)),
    }
}

/// Sweep over prune ratios.
///
/// The floating evaluator is pluggable; the fixed-point evaluator is built
/// from the configured fractional width.
#[derive(Debug, Clone)]
pub struct Sweep<F = FloatEvaluator> {
    config: SimConfig,
    float_evaluator: F,
    fixed_evaluator: FixedPointEvaluator,
    deadline: Option<Instant>,
}

impl Sweep<FloatEvaluator> {
    /// Sweep with the built-in floating evaluator.
    ///
    /// # Errors
    ///
    /// [`PruneError::Config`] if `config` is invalid.
    pub fn new(config: SimConfig) -> PruneResult<Self> {
        Self::with_evaluator(config, FloatEvaluator)
    }
}

impl<F: Evaluator> Sweep<F> {
    /// Sweep with a caller-supplied floating evaluator.
    pub fn with_evaluator(config: SimConfig, float_evaluator: F) -> PruneResult<Self> {
        config.validate()?;
        Ok(Self {
            fixed_evaluator: FixedPointEvaluator::new(config.frac_bits),
            config,
            float_evaluator,
            deadline: None,
        })
    }

    /// Grid points not finished by `deadline` are discarded whole.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Builds and measures the candidate for one ratio.
    ///
    /// Ignores any deadline set with [`Sweep::with_deadline`].
    pub fn evaluate_ratio(
        &self,
        network: &Network,
        data: &Dataset,
        ratio: f64,
    ) -> PruneResult<PruningCandidate> {
        let removed = removal_counts(network, ratio);
        let pruned = prune(network, &removed)?;
        let accuracy = self.float_evaluator.accuracy(&pruned, data)?;
        let fixed_point_accuracy = self.fixed_evaluator.accuracy(&pruned, data)?;
        Ok(Self::assemble(ratio, removed, pruned, accuracy, fixed_point_accuracy))
    }

    fn past_deadline(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Same stages as [`Sweep::evaluate_ratio`], re-checking the deadline
    /// between them. A point overtaken by the deadline yields `None` and
    /// nothing it built is kept.
    fn evaluate_before_deadline(
        &self,
        network: &Network,
        data: &Dataset,
        ratio: f64,
    ) -> PruneResult<Option<PruningCandidate>> {
        if self.past_deadline() {
            return Ok(None);
        }
        let removed = removal_counts(network, ratio);
        let pruned = prune(network, &removed)?;
        if self.past_deadline() {
            return Ok(None);
        }
        let accuracy = self.float_evaluator.accuracy(&pruned, data)?;
        if self.past_deadline() {
            return Ok(None);
        }
        let fixed_point_accuracy = self.fixed_evaluator.accuracy(&pruned, data)?;
        if self.past_deadline() {
            log::debug!("ratio {:.2} finished after the deadline; discarded", ratio);
            return Ok(None);
        }
        Ok(Some(Self::assemble(
            ratio,
            removed,
            pruned,
            accuracy,
            fixed_point_accuracy,
        )))
    }

    fn assemble(
        ratio: f64,
        removed: Vec<usize>,
        pruned: Network,
        accuracy: f64,
        fixed_point_accuracy: f64,
    ) -> PruningCandidate {
        let resources = estimate(&pruned);

        log::debug!(
            "ratio {:.2}: dims {:?}, acc {:.4}, fixed acc {:.4}, registers {}",
            ratio,
            pruned.layer_dims(),
            accuracy,
            fixed_point_accuracy,
            resources.registers
        );

        PruningCandidate {
            metrics: CandidateMetrics {
                ratio,
                removed,
                accuracy,
                fixed_point_accuracy,
                model_size_kib: pruned.model_size_kib(),
                resources,
            },
            network: pruned,
        }
    }

    /// Runs the full sweep and selects the best candidate.
    ///
    /// # Errors
    ///
    /// - [`PruneError::TooFewLayers`] if the network has no hidden layer
    /// - [`PruneError::ShapeMismatch`] if the dataset width doesn't match
    /// - [`PruneError::EmptySweep`] if the deadline passed before any point ran
    pub fn run(&self, network: &Network, data: &Dataset) -> PruneResult<SweepResult> {
        if network.num_layers() < 2 {
            return Err(PruneError::TooFewLayers(network.num_layers()));
        }
        if network.input_dim() != data.n_features() {
            return Err(PruneError::shape_mismatch(
                &[network.input_dim()],
                &[data.n_features()],
            ));
        }

        let ratios = self.config.prune_ratios();
        log::info!(
            "sweeping {} prune ratios over {:?} with Q{} fixed point",
            ratios.len(),
            network.layer_dims(),
            self.config.frac_bits
        );

        let outcomes: Vec<Option<PruningCandidate>> = if self.config.parallel {
            ratios
                .par_iter()
                .map(|&r| self.evaluate_before_deadline(network, data, r))
                .collect::<PruneResult<_>>()?
        } else {
            ratios
                .iter()
                .map(|&r| self.evaluate_before_deadline(network, data, r))
                .collect::<PruneResult<_>>()?
        };

        let planned = outcomes.len();
        let candidates: Vec<PruningCandidate> = outcomes.into_iter().flatten().collect();
        let truncated = candidates.len() < planned;
        if truncated {
            log::warn!(
                "deadline reached: {} of {} grid points discarded",
                planned - candidates.len(),
                planned
            );
        }

        let points: Vec<(f64, usize)> = candidates
            .iter()
            .map(|c| (c.metrics.accuracy, c.metrics.resources.registers))
            .collect();
        let selection = select_best(&points, self.config.tolerance)?;

        let best = &candidates[selection.index].metrics;
        log::info!(
            "selected ratio {:.2}: accuracy {:.4} (threshold {:.4}), {} registers",
            best.ratio,
            best.accuracy,
            selection.threshold,
            best.resources.registers
        );

        Ok(SweepResult {
            candidates,
            selection,
            truncated,
        })
    }
}

/// All measured candidates plus the selected one.
#[derive(Debug, Clone)]
pub struct SweepResult {
    candidates: Vec<PruningCandidate>,
    selection: Selection,
    truncated: bool,
}

impl SweepResult {
    /// Candidates in ascending ratio order.
    pub fn candidates(&self) -> &[PruningCandidate] {
        &self.candidates
    }

    /// Selection details.
    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// The selected candidate.
    pub fn best(&self) -> &PruningCandidate {
        &self.candidates[self.selection.index]
    }

    /// True when a deadline cut the sweep short.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Column-wise metrics for plotting or export.
    pub fn metrics(&self) -> SweepMetrics {
        SweepMetrics::from_candidates(&self.candidates)
    }

    /// Human-readable summary of the selected candidate.
    pub fn report(&self) -> BestModelReport {
        BestModelReport::new(self.best())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_example() {
        let accs = [0.80, 0.81, 0.79, 0.90, 0.89];

        // 0.89 has fewer registers
        let points: Vec<_> = accs.iter().copied().zip([10, 10, 10, 50, 40]).collect();
        let sel = select_best(&points, 0.01).unwrap();
        assert_eq!(sel.best_accuracy, 0.90);
        assert!((sel.threshold - 0.89).abs() < 1e-12);
        assert_eq!(sel.index, 4);

        // 0.90 has fewer registers; cheaper low-accuracy points are ignored
        let points: Vec<_> = accs.iter().copied().zip([1, 1, 1, 30, 40]).collect();
        assert_eq!(select_best(&points, 0.01).unwrap().index, 3);
    }

    #[test]
    fn test_selection_ties_prefer_earliest() {
        let points = [(0.5, 10), (0.9, 7), (0.9, 7), (0.895, 7)];
        assert_eq!(select_best(&points, 0.01).unwrap().index, 1);
    }

    #[test]
    fn test_selection_errors() {
        assert!(matches!(select_best(&[], 0.01), Err(PruneError::EmptySweep)));
        assert!(matches!(
            select_best(&[(f64::NAN, 1)], 0.01),
            Err(PruneError::NoQualifyingCandidate { .. })
        ));
    }

    #[test]
    fn test_sweep_rejects_output_only_network() {
        let network = Network::random(&[3, 1], 0).unwrap();
        let data = Dataset::new(vec![0.0; 6], vec![0, 1], 3).unwrap();
        let sweep = Sweep::new(SimConfig::default()).unwrap();
        assert!(matches!(
            sweep.run(&network, &data),
            Err(PruneError::TooFewLayers(1))
        ));
    }

    #[test]
    fn test_expired_deadline_discards_everything() {
        let network = Network::random(&[3, 4, 1], 0).unwrap();
        let data = Dataset::new(vec![0.1; 6], vec![0, 1], 3).unwrap();
        let sweep = Sweep::new(SimConfig::default())
            .unwrap()
            .with_deadline(Instant::now());
        assert!(matches!(sweep.run(&network, &data), Err(PruneError::EmptySweep)));
    }
}
