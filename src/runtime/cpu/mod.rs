//! CPU runtime implementation
//!
//! Kernels work on contiguous row-major slices. Rows (or, for reductions over
//! a non-last dimension, whole outer blocks) are independent and are handed to
//! rayon in parallel when the `rayon` feature is enabled.

mod client;
pub(crate) mod helpers;
pub(crate) mod kernels;

pub use client::CpuClient;
