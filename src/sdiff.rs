use std::fmt::{self, Display};

use crate::float::Float;

/// Single-directional dual number: a value paired with one directional
/// derivative.
///
/// `SDiff { val, dval }` represents `val + dval·ε` where `ε² = 0`. Shares
/// the algebra of [`MDiff`](crate::MDiff) with a single derivative lane;
/// the line search uses it to evaluate `ϕ(α)` and `ϕ′(α)` in one pass.
#[derive(Clone, Copy, Debug, Default)]
pub struct SDiff<F: Float> {
    /// Primal value.
    pub val: F,
    /// Directional derivative.
    pub dval: F,
}

impl<F: Float> SDiff<F> {
    /// Create a dual number with the given value and directional derivative.
    #[inline]
    pub fn new(val: F, dval: F) -> Self {
        SDiff { val, dval }
    }

    /// Create a constant (zero derivative).
    #[inline]
    pub fn constant(val: F) -> Self {
        SDiff {
            val,
            dval: F::zero(),
        }
    }

    /// Create a variable (unit derivative).
    #[inline]
    pub fn variable(val: F) -> Self {
        SDiff {
            val,
            dval: F::one(),
        }
    }

    /// Primal value.
    #[inline]
    pub fn value(&self) -> F {
        self.val
    }

    /// Directional derivative.
    #[inline]
    pub fn deriv(&self) -> F {
        self.dval
    }

    /// Exponential with the chain rule applied to the derivative.
    #[inline]
    pub fn exp(self) -> Self {
        let e = self.val.exp();
        SDiff {
            val: e,
            dval: self.dval * e,
        }
    }
}

impl<F: Float> Display for SDiff<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}ε", self.val, self.dval)
    }
}

impl<F: Float> From<F> for SDiff<F> {
    #[inline]
    fn from(val: F) -> Self {
        SDiff::constant(val)
    }
}
