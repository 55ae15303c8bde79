//! Attention operations trait.

use crate::dtype::Element;
use crate::error::Result;
use crate::tensor::Tensor;

/// Options for [`AttentionOps::scaled_dot_product_attention`]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct AttentionOptions {
    /// Mask keys after each query's position, aligning the last query with
    /// the last key
    pub causal: bool,
    /// Score scale; defaults to `1 / sqrt(head_dim)`
    pub scale: Option<f64>,
}

impl AttentionOptions {
    /// Causally masked attention with the default scale
    pub fn causal() -> Self {
        Self {
            causal: true,
            scale: None,
        }
    }

    /// Override the score scale
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }
}

/// Attention built on the online softmax
pub trait AttentionOps {
    /// `softmax(q · kᵀ · scale) · v`
    ///
    /// Shapes: `q` is `[..., Lq, D]`, `k` is `[..., Lk, D]`, `v` is
    /// `[..., Lk, Dv]` with identical leading dimensions; the result is
    /// `[..., Lq, Dv]`.
    fn scaled_dot_product_attention<T: Element>(
        &self,
        q: &Tensor<T>,
        k: &Tensor<T>,
        v: &Tensor<T>,
        options: AttentionOptions,
    ) -> Result<Tensor<T>>;
}
