//! Thin elementwise primitives: norm, scale, copy, add, reduce.
//!
//! These traverse a single tensor (or a shape-matched pair) under the same
//! stride and length rules as the contraction core, and are the only
//! operations besides the driver that touch user storage. Shape agreement
//! between paired operands is a caller contract and panics on violation.

use crate::comm::parallelize;
use crate::tensor::{IndexIter, TensorView, TensorViewMut};
use crate::types::Scalar;
use crate::util::ceil_div;
use num_traits::Zero;

/// Reduction operations for [`reduce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// Sum of all elements.
    Sum,
    /// Largest element; complex kinds order by squared magnitude.
    Max,
    /// Smallest element; complex kinds order by squared magnitude.
    Min,
    /// Element of largest magnitude, real or complex.
    AbsMax,
}

// Elements per thread below which a parallel sweep is not worth spawning.
const PARALLEL_GRAIN: usize = 4096;

/// Frobenius norm: √Σ|aᵢ|², in the real kind.
///
/// The element range is split across a thread team and the partial sums are
/// combined with a communicator reduction, so the result is deterministic for
/// a fixed team size.
pub fn norm<T: Scalar>(a: &TensorView<T>) -> T::Real {
    let total = a.num_elements();
    if total == 0 {
        return T::Real::zero();
    }
    let threads = num_cpus::get().min(ceil_div(total, PARALLEL_GRAIN)).max(1);
    let sum = parallelize(threads, |comm| {
        let (lo, hi, _) = comm.distribute_over_threads(total);
        let mut partial = T::Real::zero();
        for lin in lo..hi {
            let off = linear_offset(a.lens(), a.strides(), lin);
            partial += unsafe { *a.as_ptr().offset(off) }.abs2();
        }
        comm.reduce(partial)
    });
    T::sqrt_real(sum)
}

/// Elementwise scale `a := α · a`.
///
/// With α = 0 every element is overwritten with zero; prior contents
/// (including non-finite values) are not read.
pub fn scale<T: Scalar>(alpha: T, a: &mut TensorViewMut<T>) {
    let lens: Vec<usize> = a.lens().to_vec();
    for idx in IndexIter::new(&lens) {
        if alpha.is_zero() {
            a.set(&idx, T::zero());
        } else {
            let v = a.get(&idx);
            a.set(&idx, alpha * v);
        }
    }
}

/// Elementwise copy `b := a`. Panics unless the shapes agree.
pub fn copy<T: Scalar>(a: &TensorView<T>, b: &mut TensorViewMut<T>) {
    assert_eq!(a.lens(), b.lens(), "copy between mismatched shapes");
    for idx in IndexIter::new(a.lens()) {
        b.set(&idx, a.get(&idx));
    }
}

/// Elementwise update `b := α · a + β · b`. Panics unless the shapes agree.
///
/// With β = 0 the prior contents of `b` are not read.
pub fn add<T: Scalar>(alpha: T, a: &TensorView<T>, beta: T, b: &mut TensorViewMut<T>) {
    assert_eq!(a.lens(), b.lens(), "add between mismatched shapes");
    for idx in IndexIter::new(a.lens()) {
        let av = alpha * a.get(&idx);
        let value = if beta.is_zero() {
            av
        } else {
            av + beta * b.get(&idx)
        };
        b.set(&idx, value);
    }
}

/// Reduces a tensor to a scalar. An empty tensor reduces to zero.
pub fn reduce<T: Scalar>(a: &TensorView<T>, op: ReduceOp) -> T {
    let mut iter = IndexIter::new(a.lens());
    let Some(first) = iter.next() else {
        return T::zero();
    };
    let mut acc = a.get(&first);
    for idx in iter {
        let v = a.get(&idx);
        acc = match op {
            ReduceOp::Sum => acc + v,
            ReduceOp::Max => {
                if v.ord_key() > acc.ord_key() {
                    v
                } else {
                    acc
                }
            }
            ReduceOp::Min => {
                if v.ord_key() < acc.ord_key() {
                    v
                } else {
                    acc
                }
            }
            ReduceOp::AbsMax => {
                if v.abs2() > acc.abs2() {
                    v
                } else {
                    acc
                }
            }
        };
    }
    acc
}

fn linear_offset(lens: &[usize], strides: &[isize], mut lin: usize) -> isize {
    let mut off = 0isize;
    for (&len, &stride) in lens.iter().zip(strides).rev() {
        let digit = lin % len;
        lin /= len;
        off += digit as isize * stride;
    }
    off
}
