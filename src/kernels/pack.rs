//! Packing: gathering strided tensor blocks into contiguous micropanels.
//!
//! The logical matrix axes of the contraction are compositions of tensor
//! indices strided arbitrarily through memory. Packing resolves each fused
//! index to a precomputed element offset once, then gathers cache blocks into
//! the micropanel layout the microkernel consumes: MR-wide rows for the
//! A-side, NR-wide rows for the B-side, tails zero-padded so the kernel
//! always sees full panels.

use core::ops::Range;
use std::alloc::{Layout, alloc, dealloc};
use std::ptr::NonNull;

use crate::error::{ContractError, ContractResult};
use crate::index::BoundIndex;
use crate::types::Scalar;
use crate::util::ceil_div;

/// Vector-boundary alignment for packed panels.
const PANEL_ALIGN: usize = 64;

/// An aligned scratch buffer for one packed panel.
///
/// The buffer is raw element storage written and read through raw pointers
/// under the loop nest's barrier discipline; it hands out no references.
pub(crate) struct PackBuffer<T> {
    ptr: NonNull<T>,
    len: usize,
}

// Access is coordinated by the communicator barriers; the buffer itself is
// just memory.
unsafe impl<T: Send> Send for PackBuffer<T> {}
unsafe impl<T: Send> Sync for PackBuffer<T> {}

impl<T: Scalar> PackBuffer<T> {
    /// Allocates room for `len` elements, aligned to the vector boundary.
    pub fn new(len: usize) -> ContractResult<Self> {
        let bytes = len * size_of::<T>();
        if bytes == 0 {
            return Ok(Self {
                ptr: NonNull::dangling(),
                len,
            });
        }
        let layout = Layout::from_size_align(bytes, PANEL_ALIGN)
            .map_err(|_| ContractError::OutOfMemory { bytes })?;
        let raw = unsafe { alloc(layout) };
        match NonNull::new(raw as *mut T) {
            Some(ptr) => Ok(Self { ptr, len }),
            None => Err(ContractError::OutOfMemory { bytes }),
        }
    }

    #[inline]
    pub fn ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }
}

impl<T> Drop for PackBuffer<T> {
    fn drop(&mut self) {
        let bytes = self.len * size_of::<T>();
        if bytes > 0 {
            let layout = Layout::from_size_align(bytes, PANEL_ALIGN).unwrap();
            unsafe { dealloc(self.ptr.as_ptr() as *mut u8, layout) }
        }
    }
}

/// Element offsets of every fused index of a label group, last label fastest.
///
/// `axis_of` selects which operand's axis a bound label refers to; labels the
/// operand does not carry are skipped by returning `None`. An empty group
/// yields the single offset 0 (the fused dimension has extent one).
pub(crate) fn group_offsets(
    group: &[BoundIndex],
    strides: &[isize],
    axis_of: impl Fn(&BoundIndex) -> Option<usize>,
) -> Vec<isize> {
    let mut offsets = vec![0isize];
    for bound in group.iter().rev() {
        let Some(axis) = axis_of(bound) else {
            continue;
        };
        let stride = strides[axis];
        let mut expanded = Vec::with_capacity(offsets.len() * bound.len);
        for digit in 0..bound.len {
            let base = digit as isize * stride;
            expanded.extend(offsets.iter().map(|&inner| base + inner));
        }
        offsets = expanded;
    }
    offsets
}

/// Gathers micropanels `panels` of one cache block into `pack`.
///
/// The block is the cross product of `off_long` (the fused M or N offsets of
/// this cache block) and `off_k` (the fused K offsets of this cache block).
/// Micropanel `p` covers long-dimension positions `[p*r, (p+1)*r)`; element
/// `(kk, i)` of the panel lands at `p*r*off_k.len() + kk*r + i`. A short
/// final panel is zero-padded to `r` rows. For complex kinds `conj` applies
/// conjugation during the gather.
///
/// # Safety
///
/// `src` plus every `off_long[..] + off_k[..]` must be readable, and `pack`
/// must hold at least `ceil(off_long.len()/r) * r * off_k.len()` elements.
/// Distinct `panels` ranges touch disjoint parts of `pack`.
pub(crate) unsafe fn pack_panels<T: Scalar>(
    pack: *mut T,
    src: *const T,
    off_long: &[isize],
    off_k: &[isize],
    r: usize,
    conj: bool,
    panels: Range<usize>,
) {
    let long_len = off_long.len();
    let kc = off_k.len();
    debug_assert!(panels.end <= ceil_div(long_len, r));

    for p in panels {
        let row0 = p * r;
        let rows = r.min(long_len - row0);
        let mut dst = unsafe { pack.add(p * r * kc) };
        for &ko in off_k {
            for i in 0..r {
                let value = if i < rows {
                    let v = unsafe { *src.offset(off_long[row0 + i] + ko) };
                    if conj { v.conj() } else { v }
                } else {
                    T::zero()
                };
                unsafe {
                    *dst = value;
                    dst = dst.add(1);
                }
            }
        }
    }
}
