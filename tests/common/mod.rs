//! Common test utilities
#![allow(dead_code)]

use online_softmax::config::SoftmaxConfig;
use online_softmax::dtype::Element;
use online_softmax::runtime::cpu::CpuClient;

/// Client with the default configuration
pub fn create_cpu_client() -> CpuClient {
    CpuClient::new(SoftmaxConfig::default()).unwrap()
}

/// Client with an explicit configuration
pub fn create_client_with(config: SoftmaxConfig) -> CpuClient {
    CpuClient::new(config).unwrap()
}

/// Assert two f64 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose_f64(a: &[f64], b: &[f64], rtol: f64, atol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Assert two f32 slices are close within tolerance
pub fn assert_allclose_f32(a: &[f32], b: &[f32], rtol: f32, atol: f32, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Assert `got` matches an f64 reference within the default tolerance of `T`
pub fn assert_close_for_dtype<T: Element>(got: &[T], expected: &[f64], msg: &str) {
    let (rtol, atol) = T::DTYPE.default_tolerance();
    let widened: Vec<f64> = got.iter().map(|x| x.to_f64()).collect();
    assert_allclose_f64(&widened, expected, rtol, atol, msg);
}

/// Deterministic pseudo-random values in `[-scale, scale)`
pub fn lcg_values(n: usize, seed: u64, scale: f64) -> Vec<f64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
            (unit * 2.0 - 1.0) * scale
        })
        .collect()
}

/// Three-pass softmax of `data` viewed as `[outer, reduce, inner]`, in f64
pub fn reference_softmax(data: &[f64], shape: &[usize], dim: usize, log: bool) -> Vec<f64> {
    let outer: usize = shape[..dim].iter().product();
    let reduce = shape[dim];
    let inner: usize = shape[dim + 1..].iter().product();
    let mut out = vec![0.0; data.len()];
    for o in 0..outer {
        for i in 0..inner {
            let idx = |r: usize| o * reduce * inner + r * inner + i;
            let max = (0..reduce)
                .map(|r| data[idx(r)])
                .fold(f64::NEG_INFINITY, f64::max);
            let sum: f64 = (0..reduce).map(|r| (data[idx(r)] - max).exp()).sum();
            for r in 0..reduce {
                out[idx(r)] = if log {
                    data[idx(r)] - max - sum.ln()
                } else {
                    (data[idx(r)] - max).exp() / sum
                };
            }
        }
    }
    out
}

/// `(max, sum)` per row of `data` viewed as `[outer, reduce, inner]`
pub fn reference_statistics(data: &[f64], shape: &[usize], dim: usize) -> (Vec<f64>, Vec<f64>) {
    let outer: usize = shape[..dim].iter().product();
    let reduce = shape[dim];
    let inner: usize = shape[dim + 1..].iter().product();
    let mut maxes = Vec::with_capacity(outer * inner);
    let mut sums = Vec::with_capacity(outer * inner);
    for o in 0..outer {
        for i in 0..inner {
            let idx = |r: usize| o * reduce * inner + r * inner + i;
            let max = (0..reduce)
                .map(|r| data[idx(r)])
                .fold(f64::NEG_INFINITY, f64::max);
            maxes.push(max);
            sums.push((0..reduce).map(|r| (data[idx(r)] - max).exp()).sum());
        }
    }
    (maxes, sums)
}
