use std::borrow::Cow;

use tenrec::{Float, Scalar};

/// A single residual of the least-squares objective `½·Σᵢ rᵢ(x)²`.
///
/// The same functor is evaluated with plain floats, [`SDiff`](tenrec::SDiff)
/// (line-search directional derivatives) and [`MDiff`](tenrec::MDiff)
/// (full gradients), so the body must be generic over the scalar type.
pub trait Residual<F: Float> {
    fn eval<T: Scalar<F>>(&self, params: &[T]) -> T;
}

/// Optional reparameterization applied before each residual sweep.
///
/// `num_parameters` runs once per fit, after the AD context exists, so an
/// implementation may pre-allocate dual-number state. `apply` maps the raw
/// parameters to what the residuals see; the identity borrows its input.
pub trait ParameterTransform<F: Float> {
    fn num_parameters(&mut self, n: usize) {
        let _ = n;
    }

    fn apply<'a, T: Scalar<F>>(&self, params: &'a [T]) -> Cow<'a, [T]>;
}

/// The default transform: residuals see the parameters unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityTransform;

impl<F: Float> ParameterTransform<F> for IdentityTransform {
    #[inline]
    fn apply<'a, T: Scalar<F>>(&self, params: &'a [T]) -> Cow<'a, [T]> {
        Cow::Borrowed(params)
    }
}
