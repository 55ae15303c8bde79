//! Helper functions shared by the CPU kernels
//!
//! Precision dispatch and the chunked iteration every kernel parallelizes
//! over. With the `rayon` feature chunks run on the client's pool; without it
//! they run in order on the calling thread.

use super::CpuClient;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

// ============================================================================
// Accumulation Precision Dispatch Macro
// ============================================================================

/// Run `$body` with `$A` bound to the accumulation float for `$precision`
///
/// Usage: `dispatch_accum!(precision, A => { code using A })`
macro_rules! dispatch_accum {
    ($precision:expr, $A:ident => $body:block) => {
        match $precision {
            $crate::dtype::AccumulationPrecision::F32 => {
                type $A = f32;
                $body
            }
            $crate::dtype::AccumulationPrecision::F64 => {
                type $A = f64;
                $body
            }
        }
    };
}

pub(crate) use dispatch_accum;

// ============================================================================
// Chunked Iteration
// ============================================================================

/// Apply `f` to matching `chunk_len` chunks of `input` and `out`
pub(crate) fn for_each_chunk_pair<T, U, F>(
    client: &CpuClient,
    input: &[T],
    out: &mut [U],
    chunk_len: usize,
    f: F,
) where
    T: Sync,
    U: Send,
    F: Fn(&[T], &mut [U]) + Send + Sync,
{
    if input.is_empty() || chunk_len == 0 {
        return;
    }

    #[cfg(feature = "rayon")]
    {
        let min_len = client.parallel_min_len();
        client.install_parallelism(|| {
            input
                .par_chunks(chunk_len)
                .zip(out.par_chunks_mut(chunk_len))
                .with_min_len(min_len)
                .for_each(|(i, o)| f(i, o));
        });
    }

    #[cfg(not(feature = "rayon"))]
    {
        let _ = client;
        input
            .chunks(chunk_len)
            .zip(out.chunks_mut(chunk_len))
            .for_each(|(i, o)| f(i, o));
    }
}

/// Map every `chunk_len` chunk of `input` through `f`, preserving order
pub(crate) fn map_chunks<T, R, F>(
    client: &CpuClient,
    input: &[T],
    chunk_len: usize,
    f: F,
) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&[T]) -> R + Send + Sync,
{
    if input.is_empty() || chunk_len == 0 {
        return Vec::new();
    }

    #[cfg(feature = "rayon")]
    {
        let min_len = client.parallel_min_len();
        client.install_parallelism(|| {
            input
                .par_chunks(chunk_len)
                .with_min_len(min_len)
                .map(|c| f(c))
                .collect()
        })
    }

    #[cfg(not(feature = "rayon"))]
    {
        let _ = client;
        input.chunks(chunk_len).map(f).collect()
    }
}

/// Map every chunk through `f` and fold the results with `combine`.
///
/// `combine` must be associative with `identity` as its neutral element; the
/// grouping of partial results depends on scheduling.
pub(crate) fn reduce_chunks<T, R, F, I, C>(
    client: &CpuClient,
    input: &[T],
    chunk_len: usize,
    f: F,
    identity: I,
    combine: C,
) -> R
where
    T: Sync,
    R: Send,
    F: Fn(&[T]) -> R + Send + Sync,
    I: Fn() -> R + Send + Sync,
    C: Fn(R, R) -> R + Send + Sync,
{
    if input.is_empty() || chunk_len == 0 {
        return identity();
    }

    #[cfg(feature = "rayon")]
    {
        client.install_parallelism(|| {
            input
                .par_chunks(chunk_len)
                .map(|c| f(c))
                .reduce(&identity, &combine)
        })
    }

    #[cfg(not(feature = "rayon"))]
    {
        let _ = client;
        input.chunks(chunk_len).map(f).fold(identity(), combine)
    }
}

/// Apply `f(row_index, in_row, out_row)` to rows of different widths
pub(crate) fn for_each_indexed_row<T, U, F>(
    client: &CpuClient,
    input: &[T],
    in_len: usize,
    out: &mut [U],
    out_len: usize,
    f: F,
) where
    T: Sync,
    U: Send,
    F: Fn(usize, &[T], &mut [U]) + Send + Sync,
{
    if input.is_empty() || out.is_empty() || in_len == 0 || out_len == 0 {
        return;
    }

    #[cfg(feature = "rayon")]
    {
        let min_len = client.parallel_min_len();
        client.install_parallelism(|| {
            input
                .par_chunks(in_len)
                .zip(out.par_chunks_mut(out_len))
                .enumerate()
                .with_min_len(min_len)
                .for_each(|(idx, (i, o))| f(idx, i, o));
        });
    }

    #[cfg(not(feature = "rayon"))]
    {
        let _ = client;
        input
            .chunks(in_len)
            .zip(out.chunks_mut(out_len))
            .enumerate()
            .for_each(|(idx, (i, o))| f(idx, i, o));
    }
}
