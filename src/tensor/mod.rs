//! Tensor types
//!
//! This module provides the owned, contiguous `Tensor` consumed by the softmax
//! operations, its `Shape`, and the `ReduceLayout` used to address a single
//! reduction dimension.

mod core;
mod shape;

pub use self::core::Tensor;
pub use shape::{ReduceLayout, Shape, normalize_dim};
