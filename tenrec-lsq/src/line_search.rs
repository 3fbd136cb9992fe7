use tenrec::{Float, SDiff};

/// Sufficient-decrease constant of the weak Wolfe conditions.
const C1: f64 = 1e-4;
/// Curvature constant of the weak Wolfe conditions.
const C2: f64 = 0.9;

/// Find a step length satisfying the weak Wolfe conditions.
///
/// `f0` carries `ϕ(0)` and `ϕ′(0)`; `phi` evaluates `ϕ(α)` with its
/// derivative in one pass. `alpha` is in/out: its initial value is the
/// first trial step, and on return it holds the accepted step (on success)
/// or the last tested one (on failure).
///
/// The bracket starts as `[0, ∞)`. A trial failing sufficient decrease —
/// or evaluating non-finite — shrinks the upper end; a trial failing the
/// curvature condition raises the lower end. With a finite upper end the
/// next trial bisects, otherwise the step doubles. The iteration count is
/// capped relative to the precision of `F`, about 36 steps for `f64`.
pub fn line_search<F, Phi>(f0: SDiff<F>, mut phi: Phi, alpha: &mut F) -> bool
where
    F: Float,
    Phi: FnMut(F) -> SDiff<F>,
{
    let c1 = F::from_f64(C1).unwrap();
    let c2 = F::from_f64(C2).unwrap();
    let two = F::one() + F::one();
    let max_iter = {
        let eps = F::epsilon().to_f64().unwrap();
        (-eps.powf(2.0 / 3.0).log2()).ceil() as usize
    };

    let mut lo = F::zero();
    let mut up = F::infinity();

    for _ in 0..max_iter {
        let f = phi(*alpha);

        if !f.val.is_finite() || f.val > f0.val + c1 * *alpha * f0.dval {
            up = *alpha;
        } else if f.dval < c2 * f0.dval {
            lo = *alpha;
        } else {
            return true;
        }

        *alpha = if up < F::infinity() {
            (up + lo) / two
        } else {
            *alpha * two
        };
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn satisfies_weak_wolfe(f0: SDiff<f64>, f: SDiff<f64>, alpha: f64) -> bool {
        f.val <= f0.val + C1 * alpha * f0.dval && f.dval >= C2 * f0.dval
    }

    #[test]
    fn quadratic_accepts_wolfe_step() {
        // ϕ(α) = (α − 1)², ϕ′(0) = −2
        let phi = |a: f64| SDiff::new((a - 1.0) * (a - 1.0), 2.0 * (a - 1.0));
        let f0 = phi(0.0);
        let mut alpha = 1.0;
        assert!(line_search(f0, phi, &mut alpha));
        assert!(satisfies_weak_wolfe(f0, phi(alpha), alpha));
    }

    #[test]
    fn exponential_decay_accepts_wolfe_step() {
        // ϕ(α) = e^{−α}, ϕ′(0) = −1; curvature needs α ≳ 0.105
        let phi = |a: f64| SDiff::new((-a).exp(), -(-a).exp());
        let f0 = phi(0.0);
        let mut alpha = 1.0;
        assert!(line_search(f0, phi, &mut alpha));
        let f = phi(alpha);
        assert!(satisfies_weak_wolfe(f0, f, alpha));
    }

    #[test]
    fn tiny_initial_step_grows() {
        let phi = |a: f64| SDiff::new((a - 1.0) * (a - 1.0), 2.0 * (a - 1.0));
        let f0 = phi(0.0);
        let mut alpha = 1e-6;
        assert!(line_search(f0, phi, &mut alpha));
        assert!(alpha > 1e-3, "doubling should leave the flat region");
        assert!(satisfies_weak_wolfe(f0, phi(alpha), alpha));
    }

    #[test]
    fn non_finite_objective_fails() {
        let phi = |_a: f64| SDiff::new(f64::INFINITY, f64::NAN);
        let f0 = SDiff::new(1.0, -1.0);
        let mut alpha = 1.0;
        assert!(!line_search(f0, phi, &mut alpha));
    }
}
