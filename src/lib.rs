//! # online-softmax
//!
//! **Single-pass, numerically stable softmax reductions for CPU tensors.**
//!
//! Softmax and log-softmax normally read their input three times: once for
//! the maximum, once for the sum of exponentials, once to normalize. This
//! crate fuses the first two into an online reduction whose running state
//! `(max, Σ exp(x - max))` can be updated one element at a time or merged
//! across chunks, so every row is read twice (or once, when it is short
//! enough to hold in a local buffer).
//!
//! ## Features
//!
//! - **Online statistics**: [`ops::OnlineSoftmaxState`] with absorb and combine,
//!   finalized through [`ops::Finalizer`], usable directly on slices
//! - **Tensor ops**: softmax, log-softmax, `prepare_softmax` statistics and
//!   logsumexp along any dimension
//! - **Planning**: persistent, online, three-pass and split traversals
//!   chosen per call from shape and configuration
//! - **Fused attention**: scaled dot-product attention that never
//!   materializes the score matrix
//!
//! ## Quick Start
//!
//! ```rust
//! use online_softmax::prelude::*;
//!
//! # fn main() -> online_softmax::error::Result<()> {
//! let client = CpuClient::new(SoftmaxConfig::default())?;
//! let x = Tensor::from_slice(&[1.0f32, 2.0, 3.0], &[1, 3]);
//! let y = client.softmax(&x, -1)?;
//! assert!((y.as_slice()[2] - 0.6652).abs() < 1e-4);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): multi-threaded row and split processing
//! - `f16`: half-precision inputs (`half::f16`, `half::bf16`)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dtype;
pub mod error;
pub mod ops;
pub mod runtime;
pub mod tensor;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{SoftmaxConfig, SplitPolicy};
    pub use crate::dtype::{AccumulationPrecision, DType, Element};
    pub use crate::error::{Error, Result};
    pub use crate::ops::{
        AttentionOps, AttentionOptions, OnlineSoftmaxState, ReductionStrategy, SoftmaxKind,
        SoftmaxOps,
    };
    pub use crate::runtime::cpu::CpuClient;
    pub use crate::tensor::Tensor;
}
