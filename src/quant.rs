//! Fixed-point quantization codec.
//!
//! Every tensor in the pipeline (weights, biases, activations and
//! intermediate products) shares one global Q_B format: a real value `x` is
//! stored as the integer `floor(x * 2^B)`.
//!
//! # Truncation
//!
//! Quantization floors toward negative infinity, the way a left shift of a
//! hardware register behaves. It never rounds to nearest, so the round-trip
//! error `dequantize(quantize(x)) - x` lies in `(-2^-B, 0]`.
//!
//! # Integer width
//!
//! Values are stored as `i64`. Inputs whose scaled magnitude exceeds the
//! `i64` range (or NaN) cannot be represented: the cast pins them to
//! `i64::MIN`/`i64::MAX` (NaN to 0), and [`FixedPointCodec::quantize`] reports
//! each such batch through `log::warn!`. No other saturation is applied
//! anywhere in the codec.
//!
//! ```rust
//! use hwprune::quant::FixedPointCodec;
//!
//! let codec = FixedPointCodec::new(16);
//! let q = codec.quantize(&[0.5f32, -0.25], 1, 2);
//! assert_eq!(q.data(), &[32768, -16384]);
//! assert_eq!(codec.dequantize(&q), vec![0.5, -0.25]);
//! ```

use crate::config::DEFAULT_FRAC_BITS;

/// Integer matrix in the implicit Q_B format, row-major `[rows, cols]`.
///
/// The fractional width is not stored per tensor; it is owned by the
/// [`FixedPointCodec`] that produced the tensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizedTensor {
    data: Vec<i64>,
    rows: usize,
    cols: usize,
}

impl QuantizedTensor {
    /// Wraps raw fixed-point values.
    ///
    /// # Panics
    ///
    /// Debug-asserts that `data.len() == rows * cols`.
    pub fn from_raw(data: Vec<i64>, rows: usize, cols: usize) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        Self { data, rows, cols }
    }

    /// Zero-filled tensor.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::from_raw(vec![0; rows * cols], rows, cols)
    }

    /// Number of rows (samples for activations, inputs for weights).
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Raw values, row-major.
    #[inline]
    pub fn data(&self) -> &[i64] {
        &self.data
    }

    /// Mutable raw values, row-major.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [i64] {
        &mut self.data
    }

    /// Row `r` as a slice.
    #[inline]
    pub fn row(&self, r: usize) -> &[i64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Consumes the tensor and returns the raw values.
    pub fn into_raw(self) -> Vec<i64> {
        self.data
    }
}

/// Quantizer/dequantizer for a fixed fractional width B.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPointCodec {
    frac_bits: u32,
    scale: f64,
}

impl Default for FixedPointCodec {
    fn default() -> Self {
        Self::new(DEFAULT_FRAC_BITS)
    }
}

impl FixedPointCodec {
    /// Creates a codec for Q_`frac_bits`.
    ///
    /// # Panics
    ///
    /// Panics if `frac_bits >= 63`; use [`SimConfig::validate`](crate::SimConfig::validate)
    /// to reject such values earlier.
    pub fn new(frac_bits: u32) -> Self {
        assert!(frac_bits < 63, "fractional bits must fit in i64");
        Self {
            frac_bits,
            scale: (1u64 << frac_bits) as f64,
        }
    }

    /// Fractional bit-width B.
    #[inline]
    pub fn frac_bits(&self) -> u32 {
        self.frac_bits
    }

    /// `2^B` as a real number.
    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// True when `floor(x * 2^B)` falls outside `i64` (or `x` is NaN).
    #[inline]
    pub fn saturates(&self, x: f64) -> bool {
        // 2^63 is exact in f64
        const LIMIT: f64 = 9_223_372_036_854_775_808.0;
        let scaled = (x * self.scale).floor();
        !(-LIMIT..LIMIT).contains(&scaled)
    }

    /// Quantizes one value: `floor(x * 2^B)`.
    #[inline]
    pub fn quantize_scalar(&self, x: f64) -> i64 {
        (x * self.scale).floor() as i64
    }

    /// Dequantizes one value: `q / 2^B`.
    #[inline]
    pub fn dequantize_scalar(&self, q: i64) -> f64 {
        q as f64 / self.scale
    }

    /// Quantizes a row-major `[rows, cols]` real tensor.
    pub fn quantize<T>(&self, values: &[T], rows: usize, cols: usize) -> QuantizedTensor
    where
        T: Copy + Into<f64>,
    {
        debug_assert_eq!(values.len(), rows * cols);
        QuantizedTensor::from_raw(self.quantize_vec(values), rows, cols)
    }

    /// Quantizes a flat vector (one row).
    pub fn quantize_vec<T>(&self, values: &[T]) -> Vec<i64>
    where
        T: Copy + Into<f64>,
    {
        let mut saturated = 0usize;
        let data = values
            .iter()
            .map(|&v| {
                let x = v.into();
                if self.saturates(x) {
                    saturated += 1;
                }
                self.quantize_scalar(x)
            })
            .collect();
        if saturated > 0 {
            log::warn!(
                "{} of {} values exceed the Q{} range and were pinned to the i64 limits",
                saturated,
                values.len(),
                self.frac_bits
            );
        }
        data
    }

    /// Dequantizes a tensor into row-major reals.
    pub fn dequantize(&self, tensor: &QuantizedTensor) -> Vec<f64> {
        tensor
            .data
            .iter()
            .map(|&q| self.dequantize_scalar(q))
            .collect()
    }

    /// Rescales a 2B-fraction product back to B bits.
    ///
    /// Arithmetic right shift, i.e. floor division by `2^B`. The narrowing
    /// to `i64` truncates (two's-complement wrap); `overflowed` is set when
    /// the shifted value did not fit.
    #[inline]
    pub fn rescale_product(&self, acc: i128, overflowed: &mut bool) -> i64 {
        let shifted = acc >> self.frac_bits;
        if shifted > i64::MAX as i128 || shifted < i64::MIN as i128 {
            *overflowed = true;
        }
        shifted as i64
    }
}
