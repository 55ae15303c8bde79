//! Softmax-family operations
//!
//! This module defines the operation traits, the online statistics they are
//! built on, and the planner that picks a traversal strategy per call.
//!
//! # Design
//!
//! Operations are defined as traits implemented by the client type, which
//! carries the configuration every call is planned with.
//!
//! ```text
//! CpuClient
//!   ├── implements SoftmaxOps
//!   │     ├── softmax, log_softmax     (accumulate → finalize)
//!   │     └── prepare_softmax, logsumexp (accumulate only)
//!   └── implements AttentionOps
//!         └── scaled_dot_product_attention (online softmax per query row)
//! ```
//!
//! Every call runs the same state machine per row: an accumulate pass that
//! builds an [`OnlineSoftmaxState`], then (for the normalizing ops) one
//! finalize pass. [`plan::plan_reduction`] decides how the accumulate pass
//! walks memory; see [`ReductionStrategy`].

mod cpu;
pub mod online;
pub mod plan;
mod traits;

pub use online::{
    Accum, Finalizer, OnlineSoftmaxState, SoftmaxKind, accumulate, accumulate_chunked,
    combine_tree, finalize_into, log_softmax_slice, softmax_slice,
};
pub use plan::{ReductionPlan, ReductionStrategy};
pub use traits::*;
