//! Read-only and mutable tensor views.

use core::marker::PhantomData;

use smallvec::SmallVec;

use super::{Dims, Strides, contiguous_strides};

/// A borrowed, read-only view of a dense strided tensor.
///
/// The element at multi-index `(i_0, ..., i_{d-1})` lives at
/// `ptr + sum(i_a * stride_a)`. Strides are element counts, not bytes, and may
/// be negative; the base pointer is then not the lowest address in the view.
pub struct TensorView<'a, T> {
    ptr: *const T,
    lens: Dims,
    strides: Strides,
    _marker: PhantomData<&'a T>,
}

// Views only hand out shared reads of T.
unsafe impl<T: Sync> Send for TensorView<'_, T> {}
unsafe impl<T: Sync> Sync for TensorView<'_, T> {}

impl<'a, T: Copy> TensorView<'a, T> {
    /// Views a row-major slice as a tensor of the given lengths.
    ///
    /// Panics if the slice does not hold exactly `product(lens)` elements;
    /// that is a caller bug, not a recoverable condition.
    pub fn from_slice(data: &'a [T], lens: &[usize]) -> Self {
        let count: usize = lens.iter().product();
        assert_eq!(
            data.len(),
            count,
            "slice of {} elements viewed with lengths {:?}",
            data.len(),
            lens
        );
        Self {
            ptr: data.as_ptr(),
            lens: SmallVec::from_slice(lens),
            strides: contiguous_strides(lens),
            _marker: PhantomData,
        }
    }

    /// Builds a view from raw parts.
    ///
    /// # Safety
    ///
    /// Every multi-index within `lens` must resolve to a readable element of
    /// one allocation, for the lifetime `'a`. `lens` and `strides` must have
    /// equal rank.
    pub unsafe fn from_raw_parts(ptr: *const T, lens: &[usize], strides: &[isize]) -> Self {
        assert_eq!(lens.len(), strides.len());
        Self {
            ptr,
            lens: SmallVec::from_slice(lens),
            strides: SmallVec::from_slice(strides),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.lens.len()
    }

    #[inline]
    pub fn lens(&self) -> &[usize] {
        &self.lens
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn len(&self, axis: usize) -> usize {
        self.lens[axis]
    }

    #[inline]
    pub fn stride(&self, axis: usize) -> isize {
        self.strides[axis]
    }

    /// Total number of elements; zero if any axis is empty.
    #[inline]
    pub fn num_elements(&self) -> usize {
        self.lens.iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_elements() == 0
    }

    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr
    }

    /// Linear element offset of a multi-index.
    #[inline]
    pub fn offset_of(&self, idx: &[usize]) -> isize {
        debug_assert_eq!(idx.len(), self.rank());
        idx.iter()
            .zip(&self.strides)
            .map(|(&i, &s)| i as isize * s)
            .sum()
    }

    /// Reads the element at a multi-index, with bounds checks.
    pub fn get(&self, idx: &[usize]) -> T {
        assert_eq!(idx.len(), self.rank());
        for (axis, (&i, &len)) in idx.iter().zip(&self.lens).enumerate() {
            assert!(i < len, "index {i} out of bounds for axis {axis} (len {len})");
        }
        unsafe { *self.ptr.offset(self.offset_of(idx)) }
    }

    /// The same storage viewed with axes reordered so that new axis `a` is
    /// old axis `perm[a]`.
    pub fn permuted(&self, perm: &[usize]) -> TensorView<'a, T> {
        assert_eq!(perm.len(), self.rank());
        let lens: Dims = perm.iter().map(|&a| self.lens[a]).collect();
        let strides: Strides = perm.iter().map(|&a| self.strides[a]).collect();
        TensorView {
            ptr: self.ptr,
            lens,
            strides,
            _marker: PhantomData,
        }
    }

    /// Byte-address span `[lo, hi)` covered by the view, or `None` when empty.
    ///
    /// Used for conservative overlap detection between operands.
    pub(crate) fn address_span(&self) -> Option<(usize, usize)> {
        if self.is_empty() {
            return None;
        }
        let base = self.ptr as isize;
        let mut lo = base;
        let mut hi = base;
        for (&len, &stride) in self.lens.iter().zip(&self.strides) {
            let reach = (len as isize - 1) * stride;
            if reach < 0 {
                lo += reach;
            } else {
                hi += reach;
            }
        }
        let elem = size_of::<T>() as isize;
        Some((lo as usize, (hi + elem) as usize))
    }
}

impl<T> Clone for TensorView<'_, T> {
    fn clone(&self) -> Self {
        Self {
            ptr: self.ptr,
            lens: self.lens.clone(),
            strides: self.strides.clone(),
            _marker: PhantomData,
        }
    }
}

/// A borrowed, mutable view of a dense strided tensor.
///
/// Same data model as [`TensorView`]; the engine is the only writer while the
/// view is alive.
pub struct TensorViewMut<'a, T> {
    ptr: *mut T,
    lens: Dims,
    strides: Strides,
    _marker: PhantomData<&'a mut T>,
}

unsafe impl<T: Send> Send for TensorViewMut<'_, T> {}

impl<'a, T: Copy> TensorViewMut<'a, T> {
    /// Views a row-major slice as a mutable tensor of the given lengths.
    ///
    /// Panics if the slice does not hold exactly `product(lens)` elements.
    pub fn from_slice(data: &'a mut [T], lens: &[usize]) -> Self {
        let count: usize = lens.iter().product();
        assert_eq!(
            data.len(),
            count,
            "slice of {} elements viewed with lengths {:?}",
            data.len(),
            lens
        );
        Self {
            ptr: data.as_mut_ptr(),
            lens: SmallVec::from_slice(lens),
            strides: contiguous_strides(lens),
            _marker: PhantomData,
        }
    }

    /// Builds a mutable view from raw parts.
    ///
    /// # Safety
    ///
    /// Every multi-index within `lens` must resolve to a writable element of
    /// one allocation, exclusively borrowed for `'a`, and no two multi-indices
    /// may alias one element. `lens` and `strides` must have equal rank.
    pub unsafe fn from_raw_parts(ptr: *mut T, lens: &[usize], strides: &[isize]) -> Self {
        assert_eq!(lens.len(), strides.len());
        Self {
            ptr,
            lens: SmallVec::from_slice(lens),
            strides: SmallVec::from_slice(strides),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.lens.len()
    }

    #[inline]
    pub fn lens(&self) -> &[usize] {
        &self.lens
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn num_elements(&self) -> usize {
        self.lens.iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_elements() == 0
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr
    }

    /// A read-only view of the same storage.
    pub fn view(&self) -> TensorView<'_, T> {
        unsafe { TensorView::from_raw_parts(self.ptr, &self.lens, &self.strides) }
    }

    /// The same storage viewed with axes reordered so that new axis `a` is
    /// old axis `perm[a]`.
    pub fn permuted(self, perm: &[usize]) -> TensorViewMut<'a, T> {
        assert_eq!(perm.len(), self.rank());
        let lens: Dims = perm.iter().map(|&a| self.lens[a]).collect();
        let strides: Strides = perm.iter().map(|&a| self.strides[a]).collect();
        TensorViewMut {
            ptr: self.ptr,
            lens,
            strides,
            _marker: PhantomData,
        }
    }

    /// Linear element offset of a multi-index.
    #[inline]
    pub fn offset_of(&self, idx: &[usize]) -> isize {
        debug_assert_eq!(idx.len(), self.rank());
        idx.iter()
            .zip(&self.strides)
            .map(|(&i, &s)| i as isize * s)
            .sum()
    }

    /// Reads the element at a multi-index, with bounds checks.
    pub fn get(&self, idx: &[usize]) -> T {
        self.view().get(idx)
    }

    /// Writes the element at a multi-index, with bounds checks.
    pub fn set(&mut self, idx: &[usize], value: T) {
        assert_eq!(idx.len(), self.rank());
        for (axis, (&i, &len)) in idx.iter().zip(&self.lens).enumerate() {
            assert!(i < len, "index {i} out of bounds for axis {axis} (len {len})");
        }
        unsafe { *self.ptr.offset(self.offset_of(idx)) = value }
    }
}
