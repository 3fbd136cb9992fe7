use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::float::Float;
use crate::sdiff::SDiff;

impl<F: Float> Add for SDiff<F> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        SDiff {
            val: self.val + rhs.val,
            dval: self.dval + rhs.dval,
        }
    }
}

impl<F: Float> Sub for SDiff<F> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        SDiff {
            val: self.val - rhs.val,
            dval: self.dval - rhs.dval,
        }
    }
}

#[allow(clippy::suspicious_arithmetic_impl)]
impl<F: Float> Mul for SDiff<F> {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        SDiff {
            val: self.val * rhs.val,
            dval: rhs.val * self.dval + self.val * rhs.dval,
        }
    }
}

#[allow(clippy::suspicious_arithmetic_impl)]
impl<F: Float> Div for SDiff<F> {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        SDiff {
            val: self.val / rhs.val,
            dval: (rhs.val * self.dval - self.val * rhs.dval) / (rhs.val * rhs.val),
        }
    }
}

impl<F: Float> Neg for SDiff<F> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        SDiff {
            val: -self.val,
            dval: -self.dval,
        }
    }
}

impl<F: Float> AddAssign for SDiff<F> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<F: Float> SubAssign for SDiff<F> {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl<F: Float> MulAssign for SDiff<F> {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl<F: Float> DivAssign for SDiff<F> {
    #[inline]
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

// Mixed ops: SDiff with primitive floats. The constant contributes no
// derivative term.
macro_rules! impl_sdiff_scalar_ops {
    ($f:ty) => {
        impl Add<$f> for SDiff<$f> {
            type Output = SDiff<$f>;
            #[inline]
            fn add(self, rhs: $f) -> SDiff<$f> {
                SDiff {
                    val: self.val + rhs,
                    dval: self.dval,
                }
            }
        }

        impl Add<SDiff<$f>> for $f {
            type Output = SDiff<$f>;
            #[inline]
            fn add(self, rhs: SDiff<$f>) -> SDiff<$f> {
                SDiff {
                    val: self + rhs.val,
                    dval: rhs.dval,
                }
            }
        }

        impl Sub<$f> for SDiff<$f> {
            type Output = SDiff<$f>;
            #[inline]
            fn sub(self, rhs: $f) -> SDiff<$f> {
                SDiff {
                    val: self.val - rhs,
                    dval: self.dval,
                }
            }
        }

        impl Sub<SDiff<$f>> for $f {
            type Output = SDiff<$f>;
            #[inline]
            fn sub(self, rhs: SDiff<$f>) -> SDiff<$f> {
                SDiff {
                    val: self - rhs.val,
                    dval: -rhs.dval,
                }
            }
        }

        impl Mul<$f> for SDiff<$f> {
            type Output = SDiff<$f>;
            #[inline]
            fn mul(self, rhs: $f) -> SDiff<$f> {
                SDiff {
                    val: self.val * rhs,
                    dval: self.dval * rhs,
                }
            }
        }

        impl Mul<SDiff<$f>> for $f {
            type Output = SDiff<$f>;
            #[inline]
            fn mul(self, rhs: SDiff<$f>) -> SDiff<$f> {
                SDiff {
                    val: self * rhs.val,
                    dval: self * rhs.dval,
                }
            }
        }

        impl Div<$f> for SDiff<$f> {
            type Output = SDiff<$f>;
            #[inline]
            fn div(self, rhs: $f) -> SDiff<$f> {
                SDiff {
                    val: self.val / rhs,
                    dval: self.dval / rhs,
                }
            }
        }

        impl Div<SDiff<$f>> for $f {
            type Output = SDiff<$f>;
            #[inline]
            fn div(self, rhs: SDiff<$f>) -> SDiff<$f> {
                SDiff {
                    val: self / rhs.val,
                    dval: -self * rhs.dval / (rhs.val * rhs.val),
                }
            }
        }
    };
}

impl_sdiff_scalar_ops!(f32);
impl_sdiff_scalar_ops!(f64);

// Comparisons order by primal value only.

impl<F: Float> PartialEq for SDiff<F> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.val == other.val
    }
}

impl<F: Float> PartialOrd for SDiff<F> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.val.partial_cmp(&other.val)
    }
}
