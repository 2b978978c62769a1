//! Numeric value kinds.
//!
//! The engine is generic over four kinds: `f32`, `f64`, `Complex<f32>`, and
//! `Complex<f64>`. The [`Scalar`] trait carries the capability set the kernels
//! need (zero, one, add, mul, conj, |·|²) plus the associated real kind used
//! by norms and comparisons.

use core::fmt::Debug;
use core::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub};

use num_complex::Complex;
use num_traits::{Float, NumAssign, One, Zero};

/// A 32-bit complex number.
pub type C32 = Complex<f32>;
/// A 64-bit complex number.
pub type C64 = Complex<f64>;

/// Capability set shared by the four numeric kinds.
///
/// Arithmetic comes from `num-traits` (`Zero`, `One`) and the `core::ops`
/// bounds; the rest is the small surface the packer, microkernel, and vector
/// primitives rely on. Comparison-style reductions on complex kinds order by
/// squared magnitude.
pub trait Scalar:
    Copy
    + Send
    + Sync
    + Debug
    + PartialEq
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + MulAssign
    + 'static
{
    /// The associated real kind (`Self` for real kinds).
    type Real: Scalar<Real = Self::Real> + PartialOrd;

    /// True for the complex kinds.
    const COMPLEX: bool;

    /// Complex conjugate; identity for real kinds.
    fn conj(self) -> Self;

    /// Squared magnitude |x|², always real.
    fn abs2(self) -> Self::Real;

    /// Embeds a real value (zero imaginary part for complex kinds).
    fn from_real(re: Self::Real) -> Self;

    /// Square root in the real kind, for norms.
    fn sqrt_real(x: Self::Real) -> Self::Real;

    /// Comparison key for ordering reductions: the value itself for real
    /// kinds, the squared magnitude for complex kinds.
    fn ord_key(self) -> Self::Real;
}

impl Scalar for f32 {
    type Real = f32;

    const COMPLEX: bool = false;

    #[inline]
    fn conj(self) -> Self {
        self
    }

    #[inline]
    fn abs2(self) -> f32 {
        self * self
    }

    #[inline]
    fn from_real(re: f32) -> Self {
        re
    }

    #[inline]
    fn sqrt_real(x: f32) -> f32 {
        x.sqrt()
    }

    #[inline]
    fn ord_key(self) -> f32 {
        self
    }
}

impl Scalar for f64 {
    type Real = f64;

    const COMPLEX: bool = false;

    #[inline]
    fn conj(self) -> Self {
        self
    }

    #[inline]
    fn abs2(self) -> f64 {
        self * self
    }

    #[inline]
    fn from_real(re: f64) -> Self {
        re
    }

    #[inline]
    fn sqrt_real(x: f64) -> f64 {
        x.sqrt()
    }

    #[inline]
    fn ord_key(self) -> f64 {
        self
    }
}

impl<T> Scalar for Complex<T>
where
    T: Scalar<Real = T> + Float + NumAssign,
{
    type Real = T;

    const COMPLEX: bool = true;

    #[inline]
    fn conj(self) -> Self {
        Complex::new(self.re, -self.im)
    }

    #[inline]
    fn abs2(self) -> T {
        self.re * self.re + self.im * self.im
    }

    #[inline]
    fn from_real(re: T) -> Self {
        Complex::new(re, T::zero())
    }

    #[inline]
    fn sqrt_real(x: T) -> T {
        T::sqrt_real(x)
    }

    #[inline]
    fn ord_key(self) -> T {
        self.abs2()
    }
}
