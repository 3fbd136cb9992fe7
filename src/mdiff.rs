//! Multi-directional dual numbers with arena-backed gradient storage.
//!
//! [`MDiff`] pairs a primal value with a packed gradient over every
//! independent variable of the active [`Context`](crate::Context). The
//! gradient buffer is bump-allocated, sized to a multiple of the SIMD lane
//! count, and returned to the arena on drop. Padding lanes hold zero and
//! stay zero through every operation.

use std::fmt;

use crate::arena;
use crate::expr::MdExpr;
use crate::float::Float;
use crate::pack::SimdPack;

/// Forward-mode dual number carrying one derivative lane per independent
/// variable.
///
/// Each `MDiff` owns exactly one gradient buffer from the thread's arena:
/// moves transfer the buffer, clones copy it, and dropping returns it.
/// Values must live entirely within the lifetime of one context.
pub struct MDiff<F: Float> {
    val: F,
    dval: *mut F,
}

impl<F: Float> MDiff<F> {
    /// Create a constant: the given value with an all-zero gradient.
    pub fn constant(val: F) -> Self {
        let mut out = MDiff {
            val,
            dval: arena::new_buffer().cast::<F>(),
        };
        out.zero_lanes();
        out
    }

    /// Create the `i`-th independent variable: unit derivative in lane `i`,
    /// zero elsewhere.
    pub fn independent(val: F, i: usize) -> Self {
        let mut out = Self::constant(val);
        out.grad_mut()[i] = F::one();
        out
    }

    /// Re-seed this value as the `i`-th independent variable.
    pub fn set_independent(&mut self, val: F, i: usize) {
        self.val = val;
        self.zero_lanes();
        self.grad_mut()[i] = F::one();
    }

    /// Primal value.
    #[inline]
    pub fn value(&self) -> F {
        self.val
    }

    /// Derivative with respect to independent variable `i`.
    #[inline]
    pub fn deriv(&self, i: usize) -> F {
        self.gradient()[i]
    }

    /// Full gradient, padding lanes included.
    #[inline]
    pub fn gradient(&self) -> &[F] {
        // SAFETY: the buffer spans `num_directions` floats, is initialized,
        // and is exclusively owned by this value.
        unsafe { std::slice::from_raw_parts(self.dval, arena::num_directions()) }
    }

    #[inline]
    fn grad_mut(&mut self) -> &mut [F] {
        // SAFETY: as in `gradient`, with exclusive access via `&mut self`.
        unsafe { std::slice::from_raw_parts_mut(self.dval, arena::num_directions()) }
    }

    /// One SIMD pack of derivative lanes starting at lane `i`.
    ///
    /// `i` must be a multiple of the lane count.
    #[inline]
    pub fn diff_pack(&self, i: usize) -> F::Pack {
        F::Pack::load(&self.gradient()[i..])
    }

    fn zero_lanes(&mut self) {
        let z = F::Pack::zero();
        let lanes = F::Pack::LANES;
        let dst = self.grad_mut();
        let mut i = 0;
        while i < dst.len() {
            z.store(&mut dst[i..]);
            i += lanes;
        }
    }

    /// Materialize an expression into a fresh gradient buffer with one
    /// fused pass over the lanes.
    pub(crate) fn from_node<E: MdExpr<F>>(node: &E) -> Self {
        let val = node.value();
        let nd = arena::num_directions();
        let dval = arena::new_buffer().cast::<F>();
        // SAFETY: the fresh buffer spans `nd` floats; the loop below writes
        // every lane before the value is used.
        let dst = unsafe { std::slice::from_raw_parts_mut(dval, nd) };
        let mut i = 0;
        while i < nd {
            node.diff_values(i).store(&mut dst[i..]);
            i += F::Pack::LANES;
        }
        MDiff { val, dval }
    }
}

/// Declare a slice of values as the independent variables, in order.
pub fn independents<F: Float>(values: &[F]) -> Vec<MDiff<F>> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| MDiff::independent(v, i))
        .collect()
}

impl<F: Float> Drop for MDiff<F> {
    fn drop(&mut self) {
        arena::release_buffer(self.dval.cast::<u8>());
    }
}

impl<F: Float> Clone for MDiff<F> {
    fn clone(&self) -> Self {
        let nd = arena::num_directions();
        let dval = arena::new_buffer().cast::<F>();
        // SAFETY: both buffers span `nd` floats and cannot overlap.
        unsafe { std::ptr::copy_nonoverlapping(self.dval, dval, nd) };
        MDiff {
            val: self.val,
            dval,
        }
    }
}

// Comparisons order by primal value only; derivatives do not participate.

impl<F: Float> PartialEq for MDiff<F> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.val == other.val
    }
}

impl<F: Float> PartialOrd for MDiff<F> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.val.partial_cmp(&other.val)
    }
}

impl<F: Float> fmt::Debug for MDiff<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MDiff")
            .field("val", &self.val)
            .field("dval", &self.gradient())
            .finish()
    }
}

impl<F: Float> fmt::Display for MDiff<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.val)
    }
}
