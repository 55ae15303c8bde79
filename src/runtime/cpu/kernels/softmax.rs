//! Softmax-family reduction kernels
//!
//! Each strategy chosen by the planner has a row kernel here:
//!
//! - **Persistent**: the row is widened into a local buffer once; max, sum and
//!   the finalized values are all computed from that buffer.
//! - **Online**: `block` lanes each keep their own running state while the row
//!   is walked in blocks; lanes are merged with a combine tree, then one more
//!   loop writes the finalized values.
//! - **Three-pass**: max loop, sum-of-exp loop, normalize loop.
//! - **Split**: the row is cut into chunks whose states are built in parallel
//!   and combined before a parallel finalize.
//!
//! Reductions over a non-last dimension walk `reduce_size` lines of
//! `inner_size` adjacent elements, keeping one state per inner position.

use crate::dtype::Element;
use crate::ops::online::{
    Accum, Finalizer, OnlineSoftmaxState, SoftmaxKind, combine_tree, nan_max,
};
use crate::ops::plan::{ReductionPlan, ReductionStrategy};
use crate::runtime::cpu::CpuClient;
use crate::runtime::cpu::helpers::{for_each_chunk_pair, map_chunks, reduce_chunks};
use crate::tensor::ReduceLayout;

// ============================================================================
// Entry points
// ============================================================================

/// Softmax or log-softmax of every row of `input` into `out`
pub(crate) fn softmax_kernel<T: Element, A: Accum>(
    client: &CpuClient,
    input: &[T],
    out: &mut [T],
    layout: &ReduceLayout,
    plan: &ReductionPlan,
    kind: SoftmaxKind,
) {
    let reduce_size = layout.reduce_size;
    let strategy = plan.strategy;

    if !layout.is_contiguous_row() {
        let inner_size = layout.inner_size;
        for_each_chunk_pair(
            client,
            input,
            out,
            reduce_size * inner_size,
            |block, out_block| {
                softmax_columns::<T, A>(block, out_block, reduce_size, inner_size, strategy, kind)
            },
        );
        return;
    }

    match strategy {
        ReductionStrategy::Split { splits, block } => {
            let chunk_len = reduce_size.div_ceil(splits);
            for (row, out_row) in input
                .chunks(reduce_size)
                .zip(out.chunks_mut(reduce_size))
            {
                let state = split_statistics::<T, A>(client, row, chunk_len, block);
                let finalizer = Finalizer::new(&state, kind);
                for_each_chunk_pair(client, row, out_row, chunk_len, |i, o| {
                    finalizer.apply_slice(i, o)
                });
            }
        }
        _ => for_each_chunk_pair(client, input, out, reduce_size, |row, out_row| {
            softmax_row::<T, A>(row, out_row, strategy, kind)
        }),
    }
}

/// Final `(max, sum)` statistics of every row, ordered `(outer, inner)`
pub(crate) fn statistics_kernel<T: Element, A: Accum>(
    client: &CpuClient,
    input: &[T],
    layout: &ReduceLayout,
    plan: &ReductionPlan,
) -> Vec<OnlineSoftmaxState<A>> {
    let reduce_size = layout.reduce_size;
    let strategy = plan.strategy;

    if !layout.is_contiguous_row() {
        let inner_size = layout.inner_size;
        return map_chunks(client, input, reduce_size * inner_size, |block| {
            column_statistics::<T, A>(block, reduce_size, inner_size, strategy)
        })
        .into_iter()
        .flatten()
        .collect();
    }

    match strategy {
        ReductionStrategy::Split { splits, block } => {
            let chunk_len = reduce_size.div_ceil(splits);
            input
                .chunks(reduce_size)
                .map(|row| split_statistics::<T, A>(client, row, chunk_len, block))
                .collect()
        }
        _ => map_chunks(client, input, reduce_size, |row| {
            row_statistics::<T, A>(row, strategy)
        }),
    }
}

// ============================================================================
// Contiguous rows
// ============================================================================

/// Statistics of one contiguous row
pub(crate) fn row_statistics<T: Element, A: Accum>(
    row: &[T],
    strategy: ReductionStrategy,
) -> OnlineSoftmaxState<A> {
    match strategy {
        ReductionStrategy::Persistent => {
            let buf: Vec<A> = row.iter().map(|&x| A::load(x)).collect();
            persistent_statistics(&buf)
        }
        ReductionStrategy::Online { block } | ReductionStrategy::Split { block, .. } => {
            blocked_statistics(row, block)
        }
        ReductionStrategy::ThreePass => three_pass_statistics(row),
    }
}

/// Softmax of one contiguous row
pub(crate) fn softmax_row<T: Element, A: Accum>(
    row: &[T],
    out: &mut [T],
    strategy: ReductionStrategy,
    kind: SoftmaxKind,
) {
    match strategy {
        ReductionStrategy::Persistent => {
            // One read of the input; everything else works on the widened copy
            let buf: Vec<A> = row.iter().map(|&x| A::load(x)).collect();
            let finalizer = Finalizer::new(&persistent_statistics(&buf), kind);
            for (o, &x) in out.iter_mut().zip(&buf) {
                *o = finalizer.apply(x).store();
            }
        }
        ReductionStrategy::Online { block } | ReductionStrategy::Split { block, .. } => {
            let state = blocked_statistics::<T, A>(row, block);
            Finalizer::new(&state, kind).apply_slice(row, out);
        }
        ReductionStrategy::ThreePass => {
            let state = three_pass_statistics::<T, A>(row);
            Finalizer::new(&state, kind).apply_slice(row, out);
        }
    }
}

/// Max and sum over an already-loaded row
fn persistent_statistics<A: Accum>(buf: &[A]) -> OnlineSoftmaxState<A> {
    let max = buf.iter().fold(A::neg_infinity(), |m, &x| nan_max(m, x));
    let sum = buf.iter().fold(A::zero(), |s, &x| s + (x - max).exp());
    OnlineSoftmaxState { max, sum }
}

/// Fused max/sum loop with `block` independent lanes
fn blocked_statistics<T: Element, A: Accum>(row: &[T], block: usize) -> OnlineSoftmaxState<A> {
    let lanes_len = block.min(row.len()).max(1);
    let mut lanes = vec![OnlineSoftmaxState::<A>::new(); lanes_len];
    for chunk in row.chunks(lanes_len) {
        for (lane, &x) in lanes.iter_mut().zip(chunk) {
            lane.update(A::load(x));
        }
    }
    combine_tree(lanes)
}

/// Separate max loop and sum loop
fn three_pass_statistics<T: Element, A: Accum>(row: &[T]) -> OnlineSoftmaxState<A> {
    let max = row
        .iter()
        .fold(A::neg_infinity(), |m, &x| nan_max(m, A::load(x)));
    let sum = row
        .iter()
        .fold(A::zero(), |s, &x| s + (A::load(x) - max).exp());
    OnlineSoftmaxState { max, sum }
}

/// Chunk states built in parallel, then combined
fn split_statistics<T: Element, A: Accum>(
    client: &CpuClient,
    row: &[T],
    chunk_len: usize,
    block: usize,
) -> OnlineSoftmaxState<A> {
    reduce_chunks(
        client,
        row,
        chunk_len,
        |chunk| blocked_statistics::<T, A>(chunk, block),
        OnlineSoftmaxState::new,
        OnlineSoftmaxState::combine,
    )
}

// ============================================================================
// Non-last dimension
// ============================================================================

/// One state per inner position of an `outer` block.
///
/// Every strategy except three-pass uses the fused update here: the columns are
/// already independent lanes, so neither blocking nor splitting changes the
/// traversal.
fn column_statistics<T: Element, A: Accum>(
    block: &[T],
    reduce_size: usize,
    inner_size: usize,
    strategy: ReductionStrategy,
) -> Vec<OnlineSoftmaxState<A>> {
    let lines = block.chunks(inner_size).take(reduce_size);

    if strategy == ReductionStrategy::ThreePass {
        let mut maxes = vec![A::neg_infinity(); inner_size];
        for line in block.chunks(inner_size).take(reduce_size) {
            for (m, &x) in maxes.iter_mut().zip(line) {
                *m = nan_max(*m, A::load(x));
            }
        }
        let mut sums = vec![A::zero(); inner_size];
        for line in lines {
            for ((s, &m), &x) in sums.iter_mut().zip(&maxes).zip(line) {
                *s = *s + (A::load(x) - m).exp();
            }
        }
        return maxes
            .into_iter()
            .zip(sums)
            .map(|(max, sum)| OnlineSoftmaxState { max, sum })
            .collect();
    }

    let mut states = vec![OnlineSoftmaxState::<A>::new(); inner_size];
    for line in lines {
        for (state, &x) in states.iter_mut().zip(line) {
            state.update(A::load(x));
        }
    }
    states
}

fn softmax_columns<T: Element, A: Accum>(
    block: &[T],
    out: &mut [T],
    reduce_size: usize,
    inner_size: usize,
    strategy: ReductionStrategy,
    kind: SoftmaxKind,
) {
    let finalizers: Vec<Finalizer<A>> =
        column_statistics::<T, A>(block, reduce_size, inner_size, strategy)
            .iter()
            .map(|state| Finalizer::new(state, kind))
            .collect();
    for (line, out_line) in block.chunks(inner_size).zip(out.chunks_mut(inner_size)) {
        for ((o, &x), finalizer) in out_line.iter_mut().zip(line).zip(&finalizers) {
            *o = finalizer.apply(A::load(x)).store();
        }
    }
}
