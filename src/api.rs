use crate::arena::Context;
use crate::float::Float;
use crate::mdiff::{independents, MDiff};

/// Evaluate `f` at `x` and return its value together with the full
/// gradient, computed in one forward pass.
///
/// Opens a fresh AD context for the call, so it must not run inside
/// another active context on the same thread.
pub fn gradient<F: Float>(f: impl FnOnce(&[MDiff<F>]) -> MDiff<F>, x: &[F]) -> (F, Vec<F>) {
    let ctx = Context::<F>::new(x.len());
    let vars = independents(x);
    let y = f(&vars);
    let val = y.value();
    let grad = y.gradient()[..x.len()].to_vec();
    drop(y);
    drop(vars);
    drop(ctx);
    (val, grad)
}
