//! Runtime backends
//!
//! Only the CPU backend exists; it runs every kernel on the calling thread or
//! on a rayon pool.

pub mod cpu;
