//! Fused scaled dot-product attention
//!
//! Each query row streams over its visible keys once. The score against key
//! `j` is absorbed into an online softmax state; whenever the running maximum
//! moves, the partially accumulated output is rescaled by `exp(old - new)`
//! before `exp(score - max) · v_j` is added. The full score matrix is never
//! materialized.

use crate::dtype::Element;
use crate::ops::online::{Accum, OnlineSoftmaxState};
use crate::runtime::cpu::CpuClient;
use crate::runtime::cpu::helpers::for_each_indexed_row;

/// Problem geometry shared by every query row
#[derive(Copy, Clone, Debug)]
pub(crate) struct AttentionGeometry {
    /// Query rows per batch entry
    pub seq_q: usize,
    /// Key/value rows per batch entry
    pub seq_k: usize,
    /// Query/key feature size
    pub head_dim: usize,
    /// Value feature size
    pub value_dim: usize,
    /// Mask keys after the query's aligned position
    pub causal: bool,
}

impl AttentionGeometry {
    /// Keys visible from query `i`; the last query sees every key
    #[inline]
    pub fn visible_keys(&self, i: usize) -> usize {
        if self.causal {
            (i + 1 + self.seq_k).saturating_sub(self.seq_q).min(self.seq_k)
        } else {
            self.seq_k
        }
    }
}

/// Attention output for every `(batch, query)` row
pub(crate) fn attention_kernel<T: Element, A: Accum>(
    client: &CpuClient,
    q: &[T],
    k: &[T],
    v: &[T],
    out: &mut [T],
    geometry: AttentionGeometry,
    scale: A,
) {
    let AttentionGeometry {
        seq_q,
        seq_k,
        head_dim,
        value_dim,
        ..
    } = geometry;

    for_each_indexed_row(client, q, head_dim, out, value_dim, |row, q_row, out_row| {
        let batch = row / seq_q;
        let k_batch = &k[batch * seq_k * head_dim..(batch + 1) * seq_k * head_dim];
        let v_batch = &v[batch * seq_k * value_dim..(batch + 1) * seq_k * value_dim];
        let visible = geometry.visible_keys(row % seq_q);
        attend_row::<T, A>(
            q_row,
            &k_batch[..visible * head_dim],
            &v_batch[..visible * value_dim],
            out_row,
            scale,
        );
    });
}

/// One query row against a contiguous run of keys and values
fn attend_row<T: Element, A: Accum>(q_row: &[T], keys: &[T], values: &[T], out: &mut [T], scale: A) {
    let head_dim = q_row.len();
    let value_dim = out.len();
    let q: Vec<A> = q_row.iter().map(|&x| A::load(x)).collect();
    let mut acc = vec![A::zero(); value_dim];
    let mut state = OnlineSoftmaxState::<A>::new();

    for (k_row, v_row) in keys.chunks(head_dim).zip(values.chunks(value_dim)) {
        let score = q
            .iter()
            .zip(k_row)
            .fold(A::zero(), |s, (&qi, &ki)| s + qi * A::load(ki))
            * scale;

        let prev_max = state.max;
        state.update(score);
        if state.max != prev_max {
            let correction = (prev_max - state.max).exp();
            for a in acc.iter_mut() {
                *a = *a * correction;
            }
        }

        let weight = (score - state.max).exp();
        for (a, &vi) in acc.iter_mut().zip(v_row) {
            *a = *a + weight * A::load(vi);
        }
    }

    // A row with no visible keys has sum 0 and yields NaN, like an all-masked softmax
    let inv_sum = A::one() / state.sum;
    for (o, a) in out.iter_mut().zip(acc) {
        *o = (a * inv_sum).store();
    }
}
