//! Data type system for softmax inputs
//!
//! This module provides the `DType` enum describing supported element types and
//! the accumulation precision used by reductions over them.

mod element;

pub use element::Element;

use std::fmt;

// ============================================================================
// Accumulation Precision
// ============================================================================

/// Accumulation precision for the running max/sum statistics.
///
/// This is a floor: inputs are never accumulated in less than their own
/// precision, and reduced-precision inputs (F16, BF16) always accumulate in at
/// least F32. The running sum of exponentials is the sensitive quantity: with
/// long reduction dimensions, F32 keeps relative error around 1e-6 and F64
/// around 1e-15.
///
/// | Precision | Decimal Digits | Use Case |
/// |-----------|----------------|----------|
/// | **F32**   | ~7             | ML inference/training (default) |
/// | **F64**   | ~15-16         | Reference results, very long rows |
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum AccumulationPrecision {
    /// Accumulate in F32
    #[default]
    F32,
    /// Accumulate in F64
    F64,
}

impl AccumulationPrecision {
    /// Parse from a configuration string (`"f32"`, `"f64"`)
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "f32" | "float32" | "single" => Some(Self::F32),
            "f64" | "float64" | "double" => Some(Self::F64),
            _ => None,
        }
    }

    /// The wider of `self` and the native precision of `dtype`
    #[inline]
    pub const fn at_least(self, dtype: DType) -> Self {
        match dtype {
            DType::F64 => Self::F64,
            DType::F32 | DType::F16 | DType::BF16 => self,
        }
    }
}

// ============================================================================
// DType Enum
// ============================================================================

/// Floating point element types accepted by the softmax operations
///
/// The discriminant values are stable: F64=0, F32=1, F16=2, BF16=3.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
#[repr(u8)]
pub enum DType {
    /// 64-bit floating point
    F64 = 0,
    /// 32-bit floating point (most common)
    F32 = 1,
    /// 16-bit floating point (IEEE 754)
    F16 = 2,
    /// 16-bit brain floating point
    BF16 = 3,
}

impl DType {
    /// Short name used in logs and error messages
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::F64 => "f64",
            Self::F32 => "f32",
            Self::F16 => "f16",
            Self::BF16 => "bf16",
        }
    }

    /// Default comparison tolerance `(rtol, atol)` for results of this dtype
    pub const fn default_tolerance(self) -> (f64, f64) {
        match self {
            Self::F64 => (1e-10, 1e-12),
            Self::F32 => (1e-5, 1e-6),
            Self::F16 | Self::BF16 => (1e-2, 1e-2),
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}
