//! Simulation configuration.
//!
//! This module provides [`SimConfig`], the configuration surface consumed by
//! the fixed-point engine and the prune sweep: fractional bit-width, accuracy
//! tolerance and the prune-ratio grid.
//!
//! # Example
//!
//! ```rust
//! use hwprune::SimConfig;
//!
//! let config = SimConfig::default();
//! assert_eq!(config.frac_bits, 16);
//! assert_eq!(config.prune_ratios().len(), 26);
//!
//! // Or customize
//! let config = SimConfig::builder()
//!     .frac_bits(12)
//!     .tolerance(0.02)
//!     .prune_grid(0.0, 0.3, 0.1)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.prune_ratios(), vec![0.0, 0.1, 0.2, 0.3]);
//! ```
//!
//! # Parameters
//!
//! | Parameter | Default | Effect |
//! |-----------|---------|--------|
//! | `frac_bits` | 16 | Fractional bits B of the global Q_B format |
//! | `tolerance` | 0.01 | Accuracy slack below the best candidate |
//! | `prune_start..=prune_stop` | 0.00..=0.50 | Prune-ratio grid bounds |
//! | `prune_step` | 0.02 | Grid spacing |

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default number of fractional bits (Q16).
pub const DEFAULT_FRAC_BITS: u32 = 16;

/// Largest supported fractional width.
///
/// Two Q_B operands multiplied give 2B fractional bits inside the i128
/// accumulator; 30 keeps the shifted result well inside i64 for realistic
/// weight magnitudes.
pub const MAX_FRAC_BITS: u32 = 30;

/// Default accuracy tolerance used by candidate selection.
pub const DEFAULT_TOLERANCE: f64 = 0.01;

/// Default prune grid: 0.00 to 0.50 in steps of 0.02.
pub const DEFAULT_PRUNE_START: f64 = 0.0;
/// Upper bound (inclusive) of the default prune grid.
pub const DEFAULT_PRUNE_STOP: f64 = 0.50;
/// Spacing of the default prune grid.
pub const DEFAULT_PRUNE_STEP: f64 = 0.02;

/// Simulation configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimConfig {
    /// Fractional bit-width B shared by every tensor in the pipeline.
    pub frac_bits: u32,

    /// Candidates within `best_accuracy - tolerance` are eligible.
    pub tolerance: f64,

    /// First prune ratio of the grid.
    pub prune_start: f64,

    /// Last prune ratio of the grid (inclusive, must stay below 1).
    pub prune_stop: f64,

    /// Grid spacing.
    pub prune_step: f64,

    /// Evaluate grid points on the rayon pool.
    pub parallel: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            frac_bits: DEFAULT_FRAC_BITS,
            tolerance: DEFAULT_TOLERANCE,
            prune_start: DEFAULT_PRUNE_START,
            prune_stop: DEFAULT_PRUNE_STOP,
            prune_step: DEFAULT_PRUNE_STEP,
            parallel: true,
        }
    }
}

impl SimConfig {
    /// Starts a validated builder seeded with the defaults.
    pub fn builder() -> SimConfigBuilder {
        SimConfigBuilder::default()
    }

    /// Returns the prune-ratio grid, ascending.
    ///
    /// Points are generated from an integer step index so that the grid does
    /// not drift through repeated floating additions, and the stop value is
    /// included when it lies on the grid.
    ///
    /// ```rust
    /// use hwprune::SimConfig;
    ///
    /// let ratios = SimConfig::default().prune_ratios();
    /// assert_eq!(ratios.first(), Some(&0.0));
    /// assert!((ratios.last().unwrap() - 0.5).abs() < 1e-12);
    /// ```
    pub fn prune_ratios(&self) -> Vec<f64> {
        if self.prune_step <= 0.0 || self.prune_stop < self.prune_start {
            return Vec::new();
        }
        let span = (self.prune_stop - self.prune_start) / self.prune_step;
        // Small slack so 0.50/0.02 = 24.999.. still includes the stop point
        let steps = (span + 1e-9).floor() as usize;
        (0..=steps)
            .map(|k| {
                let r = self.prune_start + k as f64 * self.prune_step;
                // Snap to 1e-12 to strip representation noise (0.06000000000000001)
                (r * 1e12).round() / 1e12
            })
            .collect()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if:
    /// - `frac_bits` not in 1..=[`MAX_FRAC_BITS`]
    /// - `tolerance` not in [0, 1)
    /// - `prune_step <= 0`
    /// - grid bounds outside [0, 1) or `prune_start > prune_stop`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frac_bits == 0 || self.frac_bits > MAX_FRAC_BITS {
            return Err(ConfigError::InvalidFracBits(self.frac_bits));
        }
        if !(0.0..1.0).contains(&self.tolerance) {
            return Err(ConfigError::InvalidTolerance(self.tolerance));
        }
        if !(self.prune_step > 0.0) {
            return Err(ConfigError::InvalidPruneStep(self.prune_step));
        }
        if !(0.0..1.0).contains(&self.prune_start)
            || !(0.0..1.0).contains(&self.prune_stop)
            || self.prune_start > self.prune_stop
        {
            return Err(ConfigError::InvalidPruneGrid {
                start: self.prune_start,
                stop: self.prune_stop,
            });
        }
        Ok(())
    }
}

/// Builder for [`SimConfig`]; `build()` validates.
#[derive(Debug, Clone, Default)]
pub struct SimConfigBuilder {
    config: SimConfig,
}

impl SimConfigBuilder {
    /// Sets the fractional bit-width.
    pub fn frac_bits(mut self, bits: u32) -> Self {
        self.config.frac_bits = bits;
        self
    }

    /// Sets the accuracy tolerance.
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    /// Sets the prune grid `start..=stop` by `step`.
    pub fn prune_grid(mut self, start: f64, stop: f64, step: f64) -> Self {
        self.config.prune_start = start;
        self.config.prune_stop = stop;
        self.config.prune_step = step;
        self
    }

    /// Enables or disables the rayon worker pool.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<SimConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Errors returned by [`SimConfig::validate`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Fractional bits out of range.
    #[error("Fractional bits must be 1-30, got {0}")]
    InvalidFracBits(u32),

    /// Tolerance outside [0, 1).
    #[error("Tolerance must be in [0, 1), got {0}")]
    InvalidTolerance(f64),

    /// Non-positive grid step.
    #[error("Prune step must be > 0, got {0}")]
    InvalidPruneStep(f64),

    /// Grid bounds invalid.
    #[error("Invalid prune grid [{start}, {stop}]: bounds must lie in [0, 1) with start <= stop")]
    InvalidPruneGrid {
        /// Grid start.
        start: f64,
        /// Grid stop.
        stop: f64,
    },
}
