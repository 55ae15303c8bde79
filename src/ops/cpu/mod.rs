//! CPU implementations of the operation traits

mod attention;
mod softmax;
