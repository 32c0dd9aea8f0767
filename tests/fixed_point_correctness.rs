//! Tests for fixed-point numerical correctness.
//!
//! These tests verify:
//! - Quantization error bound and sign (floor never overshoots)
//! - Table exponential fidelity over its whole domain
//! - Fixed-point vs floating forward pass parity on random networks
//! - Output head post-processing (binary flatten, multi-class renormalization)

use hwprune::{
    approx_exp, fixed, Dataset, Evaluator, FixedPointCodec, FixedPointEvaluator, FixedPointModel,
    FloatEvaluator, Network,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_features(n: usize, dim: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n * dim).map(|_| rng.gen_range(0.0..1.0)).collect()
}

// =============================================================================
// Codec
// =============================================================================

/// dequantize(quantize(x)) - x lies in (-2^-B, 0] for every element
#[test]
fn test_quantization_error_bound() {
    let mut rng = StdRng::seed_from_u64(1);
    for bits in [8u32, 12, 16, 24] {
        let codec = FixedPointCodec::new(bits);
        let bound = 2f64.powi(-(bits as i32));
        let values: Vec<f64> = (0..2000).map(|_| rng.gen_range(-100.0..100.0)).collect();
        let q = codec.quantize(&values, 1, values.len());
        let back = codec.dequantize(&q);

        for (x, y) in values.iter().zip(&back) {
            let err = y - x;
            assert!(err <= 0.0, "B={}: {} overshoots to {}", bits, x, y);
            assert!(err > -bound, "B={}: error {} exceeds 2^-B for {}", bits, err, x);
        }
    }
}

/// f32 weights go through the same codec without loss beyond 2^-B
#[test]
fn test_quantization_of_f32() {
    let codec = FixedPointCodec::new(16);
    let values = [0.1f32, -0.7, 1.25, -3.5e-3];
    let back = codec.dequantize(&codec.quantize(&values, 2, 2));
    for (x, y) in values.iter().zip(&back) {
        let err = y - *x as f64;
        assert!(err <= 0.0 && err > -1.0 / 65536.0);
    }
}

// =============================================================================
// Table exponential
// =============================================================================

#[test]
fn test_approx_exp_within_one_percent() {
    let steps = 20_000;
    let mut worst = 0.0f64;
    for k in 0..=steps {
        let x = -9.999 + 19.998 * k as f64 / steps as f64;
        let rel = (approx_exp(x) - x.exp()).abs() / x.exp();
        worst = worst.max(rel);
    }
    assert!(worst < 0.01, "worst relative error {}", worst);
    println!("✓ approx_exp worst relative error: {:.2e}", worst);
}

#[test]
fn test_approx_exp_monotonic_between_grid_points() {
    let mut prev = approx_exp(-9.999);
    let mut x = -9.999;
    while x < 9.999 {
        x += 0.001;
        let y = approx_exp(x);
        assert!(y >= prev * (1.0 - 1e-3), "non-monotone at {}", x);
        prev = y;
    }
}

// =============================================================================
// Forward pass parity
// =============================================================================

#[test]
fn test_fixed_vs_float_binary_head() {
    let network = Network::random(&[16, 8, 4, 1], 42).unwrap();
    let features = random_features(64, 16, 7);

    let float_out = network.forward_batch(&features).unwrap();
    let fixed_out = fixed::predict(&network, &features, FixedPointCodec::new(16)).unwrap();

    assert_eq!(fixed_out.len(), 64, "binary head flattens to one value per sample");
    for (i, (a, b)) in float_out.iter().zip(&fixed_out).enumerate() {
        let diff = (*a as f64 - b).abs();
        assert!(diff < 5e-3, "sample {}: float={} fixed={} diff={}", i, a, b, diff);
    }
}

#[test]
fn test_fixed_vs_float_multiclass_head() {
    let network = Network::random(&[10, 12, 6, 4], 9).unwrap();
    let features = random_features(32, 10, 8);

    let float_out = network.forward_batch(&features).unwrap();
    let fixed_out = fixed::predict(&network, &features, FixedPointCodec::new(16)).unwrap();

    assert_eq!(fixed_out.len(), 32 * 4);
    for (row_f, row_q) in float_out.chunks_exact(4).zip(fixed_out.chunks_exact(4)) {
        let sum: f64 = row_q.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12, "row sum {}", sum);
        for (a, b) in row_f.iter().zip(row_q) {
            assert!((*a as f64 - b).abs() < 5e-3);
        }
    }
}

/// Fewer fractional bits should never make the emulation closer to float
#[test]
fn test_precision_degrades_with_fewer_bits() {
    let network = Network::random(&[8, 8, 1], 5).unwrap();
    let features = random_features(128, 8, 3);
    let float_out = network.forward_batch(&features).unwrap();

    let mean_err = |bits: u32| -> f64 {
        let out = fixed::predict(&network, &features, FixedPointCodec::new(bits)).unwrap();
        out.iter()
            .zip(&float_out)
            .map(|(q, f)| (q - *f as f64).abs())
            .sum::<f64>()
            / out.len() as f64
    };

    let e4 = mean_err(4);
    let e16 = mean_err(16);
    assert!(e16 < e4, "Q16 error {} should beat Q4 error {}", e16, e4);
}

#[test]
fn test_model_reuse_matches_one_shot() {
    let network = Network::random(&[6, 5, 3], 17).unwrap();
    let codec = FixedPointCodec::new(16);
    let features = random_features(10, 6, 4);

    let model = FixedPointModel::new(&network, codec);
    let a = model.predict(&features).unwrap();
    let b = fixed::predict(&network, &features, codec).unwrap();
    assert_eq!(a, b);

    let q = codec.quantize(&features, 10, 6);
    let raw = model.infer(&q).unwrap();
    assert_eq!((raw.rows(), raw.cols()), (10, 3));
}

// =============================================================================
// Evaluators
// =============================================================================

#[test]
fn test_fixed_accuracy_tracks_float_accuracy() {
    let network = Network::random(&[12, 8, 4, 1], 23).unwrap();
    let features = random_features(200, 12, 11);

    // Label with the float model's own decisions: float accuracy is 1.0
    let scores = network.forward_batch(&features).unwrap();
    let labels: Vec<u32> = scores.iter().map(|&p| u32::from(p >= 0.5)).collect();
    let data = Dataset::new(features, labels, 12).unwrap();

    let float_acc = FloatEvaluator.accuracy(&network, &data).unwrap();
    let fixed_acc = FixedPointEvaluator::new(16).accuracy(&network, &data).unwrap();

    assert_eq!(float_acc, 1.0);
    assert!(fixed_acc >= 0.95, "fixed-point accuracy {}", fixed_acc);
}
