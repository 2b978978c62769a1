//! Register-level microkernel.
//!
//! One call updates a fixed MR×NR tile of C with a rank-`kc` product of an
//! MR×kc packed A-panel and a kc×NR packed B-panel:
//!
//!     C := alpha * sum_p A[:,p] * B[p,:] + beta * C
//!
//! MR and NR are fixed per numeric kind and selected by the [`GemmKernel`]
//! impl for that kind; the accumulator lives entirely in registers for the
//! shapes chosen here. The inner product runs in the kernel's own kind with
//! no widening.

use crate::types::{C32, C64, Scalar};

/// Per-kind microkernel selection.
///
/// `kernel` assumes full MR×NR tiles; edge tiles go through a scratch tile in
/// the macrokernel and are merged under a mask there.
pub trait GemmKernel: Scalar {
    /// Register-block rows.
    const MR: usize;
    /// Register-block columns.
    const NR: usize;

    /// Rank-`kc` update of the MR×NR tile at `c` with row stride `rsc` and
    /// column stride `csc` (elements).
    ///
    /// When `beta` is zero the prior contents of the tile are not read, so C
    /// may hold uninitialized or non-finite values.
    ///
    /// # Safety
    ///
    /// `ap` must hold `MR * kc` elements, `bp` must hold `kc * NR` elements,
    /// and every `c + i*rsc + j*csc` for `i < MR`, `j < NR` must be writable
    /// and unaliased by concurrent writers.
    unsafe fn kernel(
        kc: usize,
        alpha: Self,
        ap: *const Self,
        bp: *const Self,
        beta: Self,
        c: *mut Self,
        rsc: isize,
        csc: isize,
    );
}

/// Generic accumulator body shared by the four kinds.
#[inline(always)]
unsafe fn microkernel<T: Scalar, const MR: usize, const NR: usize>(
    kc: usize,
    alpha: T,
    ap: *const T,
    bp: *const T,
    beta: T,
    c: *mut T,
    rsc: isize,
    csc: isize,
) {
    let mut ab = [[T::zero(); NR]; MR];
    let mut ap = ap;
    let mut bp = bp;

    unsafe {
        for _ in 0..kc {
            for i in 0..MR {
                let ai = *ap.add(i);
                for j in 0..NR {
                    ab[i][j] += ai * *bp.add(j);
                }
            }
            ap = ap.add(MR);
            bp = bp.add(NR);
        }

        for (i, row) in ab.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                let cptr = c.offset(rsc * i as isize + csc * j as isize);
                if beta.is_zero() {
                    *cptr = alpha * v;
                } else {
                    *cptr = beta * *cptr + alpha * v;
                }
            }
        }
    }
}

macro_rules! gemm_kernel_impl {
    ($t:ty, $mr:expr, $nr:expr) => {
        impl GemmKernel for $t {
            const MR: usize = $mr;
            const NR: usize = $nr;

            #[inline]
            unsafe fn kernel(
                kc: usize,
                alpha: Self,
                ap: *const Self,
                bp: *const Self,
                beta: Self,
                c: *mut Self,
                rsc: isize,
                csc: isize,
            ) {
                unsafe { microkernel::<$t, $mr, $nr>(kc, alpha, ap, bp, beta, c, rsc, csc) }
            }
        }
    };
}

gemm_kernel_impl!(f32, 8, 8);
gemm_kernel_impl!(f64, 8, 6);
gemm_kernel_impl!(C32, 4, 4);
gemm_kernel_impl!(C64, 4, 2);
