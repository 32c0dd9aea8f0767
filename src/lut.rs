//! Table-based exponential used by the fixed-point activations.
//!
//! Models a lookup-table exponential unit: `exp(x)` is split into
//! `exp(k) * exp(f)` with `k` an integer in `[-9, 9]` and `f` a fraction on a
//! 0.001 grid in `[-0.999, 0.999]`. Both tables are built once per process
//! and shared read-only by every worker thread.
//!
//! | Table | Entries | Content |
//! |-------|---------|---------|
//! | integer | 19 | `exp(k)`, `k = -9..=9` |
//! | fractional | 1999 | `exp(-0.999 + 0.001 * i)`, `i = 0..1999` |
//!
//! Inputs are clamped to `[-9.999, 9.999]` before lookup. Within that domain
//! the relative error versus `f64::exp` stays below [`MAX_RELATIVE_ERROR`].
//!
//! ```rust
//! use hwprune::lut::approx_exp;
//!
//! let y = approx_exp(1.5);
//! assert!((y - 1.5f64.exp()).abs() / 1.5f64.exp() < 1e-3);
//! ```

use std::sync::LazyLock;

/// Clamp bound on the input of [`approx_exp`].
pub const EXP_INPUT_LIMIT: f64 = 9.999;

/// Largest integer exponent held in the integer table.
pub const EXP_INT_LIMIT: i32 = 9;

/// Spacing of the fractional table.
pub const EXP_FRAC_STEP: f64 = 0.001;

/// Clamp bound on the fractional remainder.
pub const EXP_FRAC_LIMIT: f64 = 0.999;

/// Documented worst-case relative error of [`approx_exp`] on its domain.
///
/// Nearest-grid lookup is off by at most half a step, so the error is
/// bounded by `exp(0.0005) - 1`, about 5e-4.
pub const MAX_RELATIVE_ERROR: f64 = 1e-3;

const INT_ENTRIES: usize = (2 * EXP_INT_LIMIT + 1) as usize;
const FRAC_ENTRIES: usize = 1999;

/// Precomputed exponential tables.
#[derive(Debug)]
pub struct ExpTables {
    integer: [f64; INT_ENTRIES],
    fractional: Vec<f64>,
}

static TABLES: LazyLock<ExpTables> = LazyLock::new(ExpTables::build);

impl ExpTables {
    fn build() -> Self {
        let mut integer = [0.0f64; INT_ENTRIES];
        for (i, slot) in integer.iter_mut().enumerate() {
            *slot = ((i as i32 - EXP_INT_LIMIT) as f64).exp();
        }
        // Grid points from integer millis to avoid accumulated step error
        let fractional = (0..FRAC_ENTRIES)
            .map(|i| ((i as i32 - 999) as f64 / 1000.0).exp())
            .collect();
        Self {
            integer,
            fractional,
        }
    }

    /// Process-wide shared tables.
    #[inline]
    pub fn global() -> &'static ExpTables {
        &TABLES
    }

    /// Number of entries in the integer table.
    pub fn integer_len(&self) -> usize {
        self.integer.len()
    }

    /// Number of entries in the fractional table.
    pub fn fractional_len(&self) -> usize {
        self.fractional.len()
    }

    /// Evaluates the approximation.
    pub fn exp(&self, x: f64) -> f64 {
        let x = if x.is_nan() {
            0.0
        } else {
            x.clamp(-EXP_INPUT_LIMIT, EXP_INPUT_LIMIT)
        };
        let int_part = (x.floor() as i32).clamp(-EXP_INT_LIMIT, EXP_INT_LIMIT);
        // Remainder relative to the clamped integer part: x in [-9.999, -9)
        // lands on the negative half of the fractional table.
        let frac = (x - int_part as f64).clamp(-EXP_FRAC_LIMIT, EXP_FRAC_LIMIT);

        let int_idx = (int_part + EXP_INT_LIMIT) as usize;
        let frac_idx = (((frac + EXP_FRAC_LIMIT) / EXP_FRAC_STEP).round() as usize)
            .min(FRAC_ENTRIES - 1);

        self.integer[int_idx] * self.fractional[frac_idx]
    }
}

/// Table-based `exp(x)` on the shared tables.
#[inline]
pub fn approx_exp(x: f64) -> f64 {
    ExpTables::global().exp(x)
}

/// `1 / (1 + approx_exp(-x))`.
#[inline]
pub fn approx_sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + approx_exp(-x))
}

/// In-place softmax over one row using [`approx_exp`].
///
/// The row maximum is subtracted before exponentiating, so every exponent
/// is `<= 0` and the largest term is exactly `exp(0) = 1`.
pub fn approx_softmax_row(row: &mut [f64]) {
    let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for v in row.iter_mut() {
        *v = approx_exp(*v - max);
        sum += *v;
    }
    if sum > 0.0 {
        for v in row.iter_mut() {
            *v /= sum;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_sizes() {
        let t = ExpTables::global();
        assert_eq!(t.integer_len(), 19);
        assert_eq!(t.fractional_len(), 1999);
    }

    #[test]
    fn test_exact_grid_points() {
        assert!((approx_exp(0.0) - 1.0).abs() < 1e-12);
        assert!((approx_exp(1.0) - 1f64.exp()).abs() < 1e-12);
        assert!((approx_exp(-3.0) - (-3f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_relative_error_on_domain() {
        let mut x = -EXP_INPUT_LIMIT;
        while x <= EXP_INPUT_LIMIT {
            let approx = approx_exp(x);
            let exact = x.exp();
            let rel = (approx - exact).abs() / exact;
            assert!(rel < MAX_RELATIVE_ERROR, "x={} rel={}", x, rel);
            x += 0.0137;
        }
    }

    #[test]
    fn test_boundaries_do_not_fault() {
        let lo = approx_exp(-9.999);
        let hi = approx_exp(9.999);
        assert!(lo > 0.0 && lo.is_finite());
        assert!(hi > 0.0 && hi.is_finite());
        assert!((lo - (-9.999f64).exp()).abs() / (-9.999f64).exp() < MAX_RELATIVE_ERROR);
        assert!((hi - 9.999f64.exp()).abs() / 9.999f64.exp() < MAX_RELATIVE_ERROR);
    }

    #[test]
    fn test_out_of_range_clamps() {
        assert_eq!(approx_exp(50.0), approx_exp(9.999));
        assert_eq!(approx_exp(-50.0), approx_exp(-9.999));
        assert_eq!(approx_exp(f64::INFINITY), approx_exp(9.999));
    }

    #[test]
    fn test_sigmoid_symmetry() {
        assert!((approx_sigmoid(0.0) - 0.5).abs() < 1e-12);
        let a = approx_sigmoid(2.0);
        let b = approx_sigmoid(-2.0);
        assert!((a + b - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_softmax_row_sums_to_one() {
        let mut row = vec![1.0, 2.0, 3.0, -4.0];
        approx_softmax_row(&mut row);
        let sum: f64 = row.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!(row[2] > row[1] && row[1] > row[0] && row[0] > row[3]);
    }
}
