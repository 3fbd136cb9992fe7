//! The [`Scalar`] trait for writing AD-generic numeric code.
//!
//! Residual functors written as `fn r<T: Scalar<f64>>(x: &[T]) -> T` work
//! transparently with plain `f64`, [`SDiff<f64>`], and [`MDiff<f64>`], which
//! is how the optimizer evaluates the same residual for values, line-search
//! derivatives, and full gradients.

use std::fmt::{Debug, Display};
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::float::Float;
use crate::mdiff::MDiff;
use crate::sdiff::SDiff;

/// The central trait for AD-generic numeric code.
///
/// Operands are taken by value; clone an input when it is used more than
/// once. Constants enter through [`Scalar::from_f`] or the mixed operators
/// with a plain float on the right.
pub trait Scalar<F: Float>:
    Clone
    + Debug
    + Display
    + PartialEq
    + PartialOrd
    + Neg<Output = Self>
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Add<F, Output = Self>
    + Sub<F, Output = Self>
    + Mul<F, Output = Self>
    + Div<F, Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
{
    /// Lift a plain float to this scalar (constant — zero derivative).
    fn from_f(val: F) -> Self;

    /// Extract the primal value.
    fn value(&self) -> F;

    /// Exponential with derivative propagation.
    fn exp(self) -> Self;
}

macro_rules! impl_scalar {
    ($f:ty) => {
        impl Scalar<$f> for $f {
            #[inline]
            fn from_f(val: $f) -> Self {
                val
            }

            #[inline]
            fn value(&self) -> $f {
                *self
            }

            #[inline]
            fn exp(self) -> Self {
                <$f>::exp(self)
            }
        }

        impl Scalar<$f> for SDiff<$f> {
            #[inline]
            fn from_f(val: $f) -> Self {
                SDiff::constant(val)
            }

            #[inline]
            fn value(&self) -> $f {
                self.val
            }

            #[inline]
            fn exp(self) -> Self {
                SDiff::exp(self)
            }
        }

        impl Scalar<$f> for MDiff<$f> {
            #[inline]
            fn from_f(val: $f) -> Self {
                MDiff::constant(val)
            }

            #[inline]
            fn value(&self) -> $f {
                MDiff::value(self)
            }

            #[inline]
            fn exp(self) -> Self {
                MDiff::exp(self)
            }
        }
    };
}

impl_scalar!(f32);
impl_scalar!(f64);
