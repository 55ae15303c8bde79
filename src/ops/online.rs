//! Online softmax statistics
//!
//! The running state of a softmax reduction is the pair `(max, sum)` where
//! `sum = Σ exp(x_i - max)` over every element absorbed so far. Absorbing one
//! element or combining two states only ever exponentiates non-positive
//! values, so the state cannot overflow regardless of input magnitude.
//!
//! ```text
//! absorb:   m' = max(m, x)        s' = s·exp(m - m') + exp(x - m')
//! combine:  m' = max(ma, mb)      s' = sa·exp(ma - m') + sb·exp(mb - m')
//! finalize: softmax_i = exp(x_i - M) / S
//!           log_softmax_i = (x_i - M) - ln(S)
//! ```
//!
//! `combine` is associative and commutative up to rounding, which is what lets
//! a row be cut into chunks that are accumulated independently.

use crate::dtype::Element;
use crate::error::{Error, Result};
use num_traits::Float;
use std::fmt::Debug;

/// Floating point type the running statistics are kept in
pub trait Accum: Float + Send + Sync + Debug + 'static {
    /// Widen a stored element to accumulation precision
    fn load<T: Element>(x: T) -> Self;

    /// Narrow an accumulated value back to storage precision
    fn store<T: Element>(self) -> T;
}

impl Accum for f32 {
    #[inline]
    fn load<T: Element>(x: T) -> Self {
        x.to_f32()
    }

    #[inline]
    fn store<T: Element>(self) -> T {
        T::from_f32(self)
    }
}

impl Accum for f64 {
    #[inline]
    fn load<T: Element>(x: T) -> Self {
        x.to_f64()
    }

    #[inline]
    fn store<T: Element>(self) -> T {
        T::from_f64(self)
    }
}

/// Which normalized quantity the finalize pass emits
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SoftmaxKind {
    /// `exp(x - M) / S`
    Softmax,
    /// `(x - M) - ln(S)`
    LogSoftmax,
}

impl SoftmaxKind {
    /// Operation name used in errors and logs
    pub const fn op_name(self) -> &'static str {
        match self {
            Self::Softmax => "softmax",
            Self::LogSoftmax => "log_softmax",
        }
    }
}

/// Running `(max, sum-of-exp)` over a prefix of a reduction dimension
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OnlineSoftmaxState<A: Accum = f32> {
    /// Largest element absorbed so far (`-inf` when empty)
    pub max: A,
    /// `Σ exp(x_i - max)` over the absorbed elements
    pub sum: A,
}

impl<A: Accum> Default for OnlineSoftmaxState<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Accum> OnlineSoftmaxState<A> {
    /// State of an empty prefix: `(-inf, 0)`
    #[inline]
    pub fn new() -> Self {
        Self {
            max: A::neg_infinity(),
            sum: A::zero(),
        }
    }

    /// True if nothing has been absorbed
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sum == A::zero() && self.max == A::neg_infinity()
    }

    /// State after one more element `x`
    #[inline]
    pub fn absorb(self, x: A) -> Self {
        let max = nan_max(self.max, x);
        Self {
            max,
            sum: rescale(self.sum, self.max, max) + exp_shifted(x, max),
        }
    }

    /// Absorb `x` in place
    #[inline]
    pub fn update(&mut self, x: A) {
        *self = self.absorb(x);
    }

    /// State for the concatenation of the prefixes of `self` and `other`
    #[inline]
    pub fn combine(self, other: Self) -> Self {
        let max = nan_max(self.max, other.max);
        Self {
            max,
            sum: rescale(self.sum, self.max, max) + rescale(other.sum, other.max, max),
        }
    }

    /// Absorb every element of `xs`
    pub fn absorb_all<T: Element>(self, xs: &[T]) -> Self {
        xs.iter().fold(self, |acc, &x| acc.absorb(A::load(x)))
    }

    /// `ln Σ exp(x_i) = max + ln(sum)`
    #[inline]
    pub fn log_sum_exp(&self) -> A {
        self.max + self.sum.ln()
    }
}

impl<A: Accum> FromIterator<A> for OnlineSoftmaxState<A> {
    fn from_iter<I: IntoIterator<Item = A>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), Self::absorb)
    }
}

/// `max` that propagates NaN from either side
#[inline]
pub(crate) fn nan_max<A: Accum>(a: A, b: A) -> A {
    if a.is_nan() || b.is_nan() {
        A::nan()
    } else if b > a {
        b
    } else {
        a
    }
}

/// `sum · exp(from - to)`, exact when the maximum did not move.
///
/// Skipping the exponential for `from == to` keeps `-inf - -inf` out of the
/// arithmetic while the state is still empty.
#[inline]
fn rescale<A: Accum>(sum: A, from: A, to: A) -> A {
    if from == to { sum } else { sum * (from - to).exp() }
}

/// `exp(x - max)` with the element equal to the maximum contributing exactly 1
#[inline]
fn exp_shifted<A: Accum>(x: A, max: A) -> A {
    if x == max { A::one() } else { (x - max).exp() }
}

// ============================================================================
// Slice-level routines
// ============================================================================

/// Accumulate statistics over a slice in one sequential pass
pub fn accumulate<A: Accum, T: Element>(xs: &[T]) -> OnlineSoftmaxState<A> {
    OnlineSoftmaxState::new().absorb_all(xs)
}

/// Accumulate each `chunk_size` chunk independently, then combine the partial
/// states left to right.
///
/// Produces the same statistics as [`accumulate`] up to rounding.
pub fn accumulate_chunked<A: Accum, T: Element>(
    xs: &[T],
    chunk_size: usize,
) -> Result<OnlineSoftmaxState<A>> {
    if chunk_size == 0 {
        return Err(Error::invalid_argument("chunk_size", "must be at least 1"));
    }
    Ok(xs
        .chunks(chunk_size)
        .map(accumulate::<A, T>)
        .fold(OnlineSoftmaxState::new(), OnlineSoftmaxState::combine))
}

/// Combine partial states pairwise, halving the count each round
pub fn combine_tree<A: Accum>(mut states: Vec<OnlineSoftmaxState<A>>) -> OnlineSoftmaxState<A> {
    while states.len() > 1 {
        let half = states.len().div_ceil(2);
        for i in 0..states.len() / 2 {
            states[i] = states[i].combine(states[i + half]);
        }
        states.truncate(half);
    }
    states.pop().unwrap_or_default()
}

/// Per-row constants of the finalize pass, derived once from the final state
///
/// `ln(S)` is kept apart from `M` so log-softmax is `(x - M) - ln(S)`; folding
/// them into one offset would round `ln(S)` to the ulp of `M`.
#[derive(Copy, Clone, Debug)]
pub struct Finalizer<A: Accum> {
    kind: SoftmaxKind,
    max: A,
    inv_sum: A,
    log_sum: A,
}

impl<A: Accum> Finalizer<A> {
    /// Prepare to finalize against `state`
    #[inline]
    pub fn new(state: &OnlineSoftmaxState<A>, kind: SoftmaxKind) -> Self {
        Self {
            kind,
            max: state.max,
            inv_sum: A::one() / state.sum,
            log_sum: state.sum.ln(),
        }
    }

    /// Finalized value for one input element
    #[inline]
    pub fn apply(&self, x: A) -> A {
        match self.kind {
            SoftmaxKind::Softmax => (x - self.max).exp() * self.inv_sum,
            SoftmaxKind::LogSoftmax => (x - self.max) - self.log_sum,
        }
    }

    /// Finalize a contiguous run of elements
    #[inline]
    pub fn apply_slice<T: Element>(&self, input: &[T], out: &mut [T]) {
        for (o, &x) in out.iter_mut().zip(input) {
            *o = self.apply(A::load(x)).store();
        }
    }
}

/// Write the finalized values of `input` into `out` (the second pass)
pub fn finalize_into<A: Accum, T: Element>(
    state: &OnlineSoftmaxState<A>,
    input: &[T],
    out: &mut [T],
    kind: SoftmaxKind,
) -> Result<()> {
    if input.len() != out.len() {
        return Err(Error::shape_mismatch(&[input.len()], &[out.len()]));
    }
    if state.is_empty() {
        return Err(Error::EmptyReduction {
            dim: 0,
            op: kind.op_name(),
        });
    }
    Finalizer::new(state, kind).apply_slice(input, out);
    Ok(())
}

/// Softmax of a whole slice in two passes
pub fn softmax_slice<T: Element>(xs: &[T]) -> Result<Vec<T>> {
    two_pass_slice(xs, SoftmaxKind::Softmax)
}

/// Log-softmax of a whole slice in two passes
pub fn log_softmax_slice<T: Element>(xs: &[T]) -> Result<Vec<T>> {
    two_pass_slice(xs, SoftmaxKind::LogSoftmax)
}

fn two_pass_slice<T: Element>(xs: &[T], kind: SoftmaxKind) -> Result<Vec<T>> {
    if xs.is_empty() {
        return Err(Error::EmptyReduction {
            dim: 0,
            op: kind.op_name(),
        });
    }
    let state = accumulate::<f64, T>(xs);
    let mut out = xs.to_vec();
    finalize_into(&state, xs, &mut out, kind)?;
    Ok(out)
}
