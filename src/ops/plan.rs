//! Reduction planning
//!
//! Picks how a softmax-family reduction walks its input, from the number of
//! rows, the length of the reduced dimension, and the active configuration.

use crate::config::{SoftmaxConfig, SplitPolicy};
use crate::tensor::ReduceLayout;

/// How the reduced dimension of every row is traversed
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReductionStrategy {
    /// The whole row is loaded once; no reduction loop
    Persistent,
    /// Fused max/sum loop over blocks of `block` lanes, then a finalize loop
    Online {
        /// Lanes per block
        block: usize,
    },
    /// Separate max, sum and normalize loops
    ThreePass,
    /// Row cut into `splits` chunks accumulated in parallel, partial
    /// statistics combined, then a finalize loop
    Split {
        /// Number of chunks per row
        splits: usize,
        /// Lanes per block inside a chunk
        block: usize,
    },
}

/// Strategy chosen for one call, with the shape facts it was chosen from
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReductionPlan {
    /// Chosen strategy
    pub strategy: ReductionStrategy,
    /// Number of independent rows
    pub rows: usize,
    /// Length of the reduced dimension
    pub reduce_size: usize,
}

impl ReductionPlan {
    /// Number of times each input element is read
    pub fn input_passes(&self) -> usize {
        match self.strategy {
            ReductionStrategy::Persistent => 1,
            ReductionStrategy::Online { .. } | ReductionStrategy::Split { .. } => 2,
            ReductionStrategy::ThreePass => 3,
        }
    }

    /// Number of loops over the reduced dimension
    pub fn reduction_loops(&self) -> usize {
        match self.strategy {
            ReductionStrategy::Persistent => 0,
            _ => self.input_passes(),
        }
    }

    /// Loops needed to produce only the `(max, sum)` statistics
    pub fn statistics_loops(&self) -> usize {
        match self.strategy {
            ReductionStrategy::Persistent => 0,
            ReductionStrategy::Online { .. } | ReductionStrategy::Split { .. } => 1,
            ReductionStrategy::ThreePass => 2,
        }
    }

    /// True when partial statistics from several workers are combined per row
    pub fn is_split(&self) -> bool {
        matches!(self.strategy, ReductionStrategy::Split { .. })
    }
}

/// Whether cutting each row across workers looks profitable
pub fn split_is_promising(rows: usize, reduce_size: usize, config: &SoftmaxConfig) -> bool {
    reduce_size >= config.split_min_size && rows < config.split_max_rows
}

/// Choose a strategy for reducing `layout` under `config`.
///
/// Precedence: persistent (short rows), three-pass (online disabled), split
/// (only with `SplitPolicy::Combine`), online.
pub fn plan_reduction(layout: &ReduceLayout, config: &SoftmaxConfig) -> ReductionPlan {
    let rows = layout.rows();
    let reduce_size = layout.reduce_size;
    let block = config.block_size.max(1);

    let strategy = if reduce_size <= config.persistent_threshold {
        ReductionStrategy::Persistent
    } else if !config.online_softmax {
        ReductionStrategy::ThreePass
    } else if split_is_promising(rows, reduce_size, config) {
        match config.split_policy {
            SplitPolicy::Combine => ReductionStrategy::Split {
                splits: split_count(reduce_size, config),
                block,
            },
            SplitPolicy::Unsplit => {
                tracing::debug!(
                    rows,
                    reduce_size,
                    "split reduction looks profitable; keeping online softmax unsplit"
                );
                ReductionStrategy::Online { block }
            }
        }
    } else {
        ReductionStrategy::Online { block }
    };

    let plan = ReductionPlan {
        strategy,
        rows,
        reduce_size,
    };
    tracing::debug!(strategy = ?plan.strategy, rows, reduce_size, "planned softmax reduction");
    plan
}

/// Chunks per row for a split: enough to occupy the pool, never so many that
/// a chunk drops below half the split threshold.
fn split_count(reduce_size: usize, config: &SoftmaxConfig) -> usize {
    let workers = config.num_threads.unwrap_or_else(available_workers).max(2);
    let min_chunk = (config.split_min_size / 2).max(1);
    workers.min(reduce_size.div_ceil(min_chunk)).max(2)
}

#[cfg(feature = "rayon")]
fn available_workers() -> usize {
    rayon::current_num_threads()
}

#[cfg(not(feature = "rayon"))]
fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
