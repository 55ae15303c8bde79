//! Property tests for the online softmax statistics
//!
//! The accumulate/combine/finalize routines must agree with a direct
//! three-pass computation for any input, however the input is chunked.

mod common;

use common::assert_allclose_f64;
use online_softmax::ops::{
    OnlineSoftmaxState, SoftmaxKind, accumulate, accumulate_chunked, combine_tree, finalize_into,
    log_softmax_slice, softmax_slice,
};
use proptest::prelude::*;

fn direct_statistics(xs: &[f64]) -> (f64, f64) {
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let sum = xs.iter().map(|x| (x - max).exp()).sum();
    (max, sum)
}

fn finite_row() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-100.0f64..100.0, 1..300)
}

proptest! {
    #[test]
    fn accumulate_matches_direct(xs in finite_row()) {
        let state = accumulate::<f64, f64>(&xs);
        let (max, sum) = direct_statistics(&xs);

        prop_assert_eq!(state.max, max);
        prop_assert!((state.sum - sum).abs() <= 1e-12 * sum);
    }

    #[test]
    fn chunking_does_not_change_statistics(xs in finite_row(), chunk in 1usize..64) {
        let sequential = accumulate::<f64, f64>(&xs);
        let chunked = accumulate_chunked::<f64, f64>(&xs, chunk).unwrap();

        prop_assert_eq!(chunked.max, sequential.max);
        prop_assert!((chunked.sum - sequential.sum).abs() <= 1e-12 * sequential.sum);
    }

    #[test]
    fn combine_order_does_not_matter(xs in finite_row(), chunk in 1usize..32) {
        let parts: Vec<OnlineSoftmaxState<f64>> =
            xs.chunks(chunk).map(accumulate::<f64, f64>).collect();

        let left = parts
            .iter()
            .fold(OnlineSoftmaxState::new(), |acc, &s| acc.combine(s));
        let right = parts
            .iter()
            .rev()
            .fold(OnlineSoftmaxState::new(), |acc, &s| s.combine(acc));
        let reversed = parts
            .iter()
            .rev()
            .fold(OnlineSoftmaxState::new(), |acc, &s| acc.combine(s));
        let tree = combine_tree(parts);

        for other in [right, reversed, tree] {
            prop_assert_eq!(other.max, left.max);
            prop_assert!((other.sum - left.sum).abs() <= 1e-12 * left.sum);
        }
    }

    #[test]
    fn finalized_softmax_sums_to_one(xs in finite_row()) {
        let probs = softmax_slice(&xs).unwrap();
        let total: f64 = probs.iter().sum();

        prop_assert!((total - 1.0).abs() < 1e-12);
        prop_assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn log_softmax_is_log_of_softmax(xs in prop::collection::vec(-20.0f64..20.0, 1..200)) {
        let probs = softmax_slice(&xs).unwrap();
        let logs = log_softmax_slice(&xs).unwrap();
        let expected: Vec<f64> = probs.iter().map(|p| p.ln()).collect();

        assert_allclose_f64(&logs, &expected, 1e-10, 1e-10, "log_softmax");
    }

    #[test]
    fn f32_statistics_track_f64(xs in prop::collection::vec(-50.0f32..50.0, 1..500)) {
        let narrow = accumulate::<f32, f32>(&xs);
        let wide = accumulate::<f64, f32>(&xs);

        prop_assert_eq!(narrow.max as f64, wide.max);
        prop_assert!(((narrow.sum as f64) - wide.sum).abs() <= 1e-4 * wide.sum);
    }

    #[test]
    fn shifting_inputs_leaves_softmax_unchanged(
        xs in prop::collection::vec(-10.0f64..10.0, 1..100),
        shift in -1.0e4f64..1.0e4,
    ) {
        let shifted: Vec<f64> = xs.iter().map(|x| x + shift).collect();
        let base = softmax_slice(&xs).unwrap();
        let moved = softmax_slice(&shifted).unwrap();

        assert_allclose_f64(&moved, &base, 1e-9, 1e-12, "shift invariance");
    }
}

#[test]
fn test_known_chunks_combine_to_sequential() {
    let sequential = accumulate::<f64, f64>(&[1.0, 2.0, 3.0]);
    let combined = accumulate::<f64, f64>(&[1.0]).combine(accumulate::<f64, f64>(&[2.0, 3.0]));

    assert_eq!(combined.max, 3.0);
    assert_eq!(sequential.max, 3.0);
    assert!((combined.sum - sequential.sum).abs() < 1e-15);

    let mut out = [0.0f64; 3];
    finalize_into(&combined, &[1.0, 2.0, 3.0], &mut out, SoftmaxKind::Softmax).unwrap();
    assert_allclose_f64(&out, &[0.0900, 0.2447, 0.6652], 0.0, 1e-4, "chunked [1, 2, 3]");
}

#[test]
fn test_empty_state_is_combine_identity() {
    let state = accumulate::<f32, f32>(&[0.5, -2.0, 7.0]);

    assert_eq!(state.combine(OnlineSoftmaxState::new()), state);
    assert_eq!(OnlineSoftmaxState::new().combine(state), state);
}

#[test]
fn test_finalize_empty_state_is_error() {
    let state = OnlineSoftmaxState::<f32>::new();
    let mut out: [f32; 0] = [];

    assert!(finalize_into(&state, &[] as &[f32], &mut out, SoftmaxKind::LogSoftmax).is_err());
    assert!(softmax_slice::<f32>(&[]).is_err());
}

#[test]
fn test_collect_into_state() {
    let state: OnlineSoftmaxState<f64> = [1.0e4, 1.0e4 - 1.0, -1.0e4].into_iter().collect();

    assert_eq!(state.max, 1.0e4);
    assert!(state.sum.is_finite());
    assert!((state.log_sum_exp() - (1.0e4 + (1.0 + (-1.0f64).exp()).ln())).abs() < 1e-9);
}
