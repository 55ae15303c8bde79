//! Softmax operations trait.

use crate::dtype::Element;
use crate::error::Result;
use crate::tensor::Tensor;

/// Exponential-normalization reductions along one dimension
///
/// `dim` may be negative to count from the last dimension. A zero-length
/// `dim` is rejected with `Error::EmptyReduction`.
pub trait SoftmaxOps {
    /// Softmax along a dimension: `exp(x - max) / Σ exp(x - max)`
    fn softmax<T: Element>(&self, a: &Tensor<T>, dim: isize) -> Result<Tensor<T>>;

    /// Log-softmax along a dimension: `(x - max) - ln Σ exp(x - max)`
    fn log_softmax<T: Element>(&self, a: &Tensor<T>, dim: isize) -> Result<Tensor<T>>;

    /// The `(max, Σ exp(x - max))` statistics of a softmax along `dim`
    ///
    /// Both outputs keep `dim` with size 1, so they broadcast against `a`.
    fn prepare_softmax<T: Element>(
        &self,
        a: &Tensor<T>,
        dim: isize,
    ) -> Result<(Tensor<T>, Tensor<T>)>;

    /// `ln Σ exp(x)` along a dimension
    fn logsumexp<T: Element>(&self, a: &Tensor<T>, dim: isize, keepdim: bool)
    -> Result<Tensor<T>>;
}
