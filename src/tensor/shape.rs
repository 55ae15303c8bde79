//! Shape type and reduction layout helpers

use crate::error::{Error, Result};
use smallvec::SmallVec;
use std::fmt;
use std::ops::Deref;

/// Stack allocation threshold for dimensions
pub(crate) const STACK_DIMS: usize = 4;

/// Shape type: dimensions of a tensor
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Shape(SmallVec<[usize; STACK_DIMS]>);

impl Shape {
    /// View shape as a slice.
    pub fn as_slice(&self) -> &[usize] {
        self.0.as_slice()
    }

    /// Number of dimensions in this shape.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// Total number of elements described by this shape.
    #[inline]
    pub fn numel(&self) -> usize {
        self.0.iter().product()
    }

    /// Copy of this shape with dimension `dim` set to 1 or removed.
    pub fn reduced(&self, dim: usize, keepdim: bool) -> Self {
        if keepdim {
            self.0
                .iter()
                .enumerate()
                .map(|(i, &s)| if i == dim { 1 } else { s })
                .collect()
        } else {
            self.0
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != dim)
                .map(|(_, &s)| s)
                .collect()
        }
    }
}

impl Deref for Shape {
    type Target = [usize];

    fn deref(&self) -> &Self::Target {
        self.0.as_slice()
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<[usize]> for Shape {
    fn as_ref(&self) -> &[usize] {
        self.0.as_slice()
    }
}

impl From<&[usize]> for Shape {
    fn from(value: &[usize]) -> Self {
        Self(value.iter().copied().collect())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(value: [usize; N]) -> Self {
        Self(value.into_iter().collect())
    }
}

impl FromIterator<usize> for Shape {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Normalize a possibly negative dimension index
pub fn normalize_dim(ndim: usize, dim: isize) -> Option<usize> {
    if dim >= 0 {
        let d = dim as usize;
        if d < ndim { Some(d) } else { None }
    } else {
        let d = ndim as isize + dim;
        if d >= 0 { Some(d as usize) } else { None }
    }
}

/// `outer × reduce × inner` view of a contiguous tensor reduced along one dim.
///
/// Element `(o, r, i)` lives at `o * reduce_size * inner_size + r * inner_size + i`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReduceLayout {
    /// Product of dimensions before the reduced one
    pub outer_size: usize,
    /// Size of the reduced dimension
    pub reduce_size: usize,
    /// Product of dimensions after the reduced one
    pub inner_size: usize,
    /// Normalized reduced dimension
    pub dim: usize,
}

impl ReduceLayout {
    /// Build the layout for reducing `shape` along `dim`.
    ///
    /// Fails for an out-of-range `dim`, or with `EmptyReduction` when the
    /// reduced dimension has length zero.
    pub fn new(shape: &[usize], dim: isize, op: &'static str) -> Result<Self> {
        let ndim = shape.len();
        // 0-d tensors reduce over their single implicit element
        if ndim == 0 && (dim == 0 || dim == -1) {
            return Ok(Self {
                outer_size: 1,
                reduce_size: 1,
                inner_size: 1,
                dim: 0,
            });
        }
        let dim_idx = normalize_dim(ndim, dim).ok_or(Error::InvalidDimension { dim, ndim })?;
        let reduce_size = shape[dim_idx];
        if reduce_size == 0 {
            return Err(Error::EmptyReduction { dim: dim_idx, op });
        }
        Ok(Self {
            outer_size: shape[..dim_idx].iter().product(),
            reduce_size,
            inner_size: shape[dim_idx + 1..].iter().product(),
            dim: dim_idx,
        })
    }

    /// Number of independent reductions (rows)
    #[inline]
    pub fn rows(&self) -> usize {
        self.outer_size * self.inner_size
    }

    /// True when the reduced elements of a row are adjacent in memory
    #[inline]
    pub fn is_contiguous_row(&self) -> bool {
        self.inner_size == 1
    }
}
