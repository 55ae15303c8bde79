//! CPU kernel implementations
//!
//! Kernels are generic over the storage element `T: Element` and the
//! accumulation float `A: Accum`; precision is chosen by the caller.

pub(crate) mod attention;
pub(crate) mod softmax;

pub(crate) use attention::{AttentionGeometry, attention_kernel};
pub(crate) use softmax::{softmax_kernel, statistics_kernel};
