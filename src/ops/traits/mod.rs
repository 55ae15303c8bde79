//! Operation traits

mod attention;
mod softmax;

pub use attention::{AttentionOps, AttentionOptions};
pub use softmax::SoftmaxOps;
