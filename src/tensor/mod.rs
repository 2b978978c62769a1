//! Strided tensor views.
//!
//! Views borrow caller-owned storage and carry the metadata the engine needs:
//! per-axis lengths and element strides. Strides may be negative or
//! non-contiguous; views never own storage.

mod iter;
mod view;

pub use iter::IndexIter;
pub use view::{TensorView, TensorViewMut};

use smallvec::SmallVec;

/// Per-axis lengths, inline up to rank 6.
pub type Dims = SmallVec<[usize; 6]>;

/// Per-axis element strides, inline up to rank 6.
pub type Strides = SmallVec<[isize; 6]>;

/// Row-major (last axis fastest) strides for the given lengths.
pub fn contiguous_strides(lens: &[usize]) -> Strides {
    let mut strides: Strides = SmallVec::from_elem(0, lens.len());
    let mut acc = 1isize;
    for (s, &len) in strides.iter_mut().zip(lens).rev() {
        *s = acc;
        acc *= len as isize;
    }
    strides
}
