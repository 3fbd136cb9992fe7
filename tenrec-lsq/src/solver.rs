//! Gauss–Newton / structured-BFGS minimization of `½·Σᵢ rᵢ(x)²`.
//!
//! Each iteration evaluates every residual as an [`MDiff`] to accumulate
//! the gradient and the Gauss–Newton normal matrix, solves for the search
//! direction by Cholesky (falling back to steepest descent on an
//! indefinite matrix), picks a step with a weak-Wolfe line search driven
//! by [`SDiff`] directional derivatives, and maintains an explicit
//! correction `A` to `JᵀJ` through a secant update so `B = JᵀJ + A`
//! approximates the full Hessian.

use std::fmt;

use log::info;

use tenrec::alloc::AlignedBuf;
use tenrec::pack::{add_assign_packed, fill_packed, negate_into};
use tenrec::{independents, next_multiple_of_lanes, Context, Float, MDiff, SDiff, Scalar, SimdPack};

use crate::blas;
use crate::cholesky::cholesky_solve;
use crate::line_search::line_search;
use crate::residual::{IdentityTransform, ParameterTransform, Residual};

/// Seed factor for the initial Hessian correction diagonal.
const INITIAL_DIAG: f64 = 1e-4;
/// Minimum curvature `z·s / s·s` for the secant update to be trusted.
const CURVATURE_MIN: f64 = 1e-6;
/// Consecutive small-decrease iterations before declaring stagnation.
const STAGNATION_LIMIT: usize = 15;

/// Whether the solver reports per-iteration progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// One `log::info!` line per iteration plus a terminal stop reason.
    Verbose,
    /// No output.
    Silent,
}

/// Configuration for [`gn_sbfgs_min_config`].
#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Maximum number of outer iterations (default: 1000).
    pub max_iter: usize,
    /// Progress reporting (default: [`Verbosity::Verbose`]).
    pub verbosity: Verbosity,
}

impl Default for FitConfig {
    fn default() -> Self {
        FitConfig {
            max_iter: 1000,
            verbosity: Verbosity::Verbose,
        }
    }
}

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Max norm of the gradient fell below the tolerance.
    GradientTolerance,
    /// The decrease stayed below the tolerance for
    /// [`STAGNATION_LIMIT`] consecutive iterations.
    Stagnation,
    /// No step satisfying the weak Wolfe conditions was found.
    LineSearchFailed,
    /// Reached the maximum number of iterations.
    MaxIterations,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::GradientTolerance => {
                write!(f, "gradient max norm smaller than tolerance")
            }
            Termination::Stagnation => write!(
                f,
                "change in function value was smaller than tolerance for {} consecutive iterations",
                STAGNATION_LIMIT
            ),
            Termination::LineSearchFailed => {
                write!(f, "no step satisfying the weak wolfe conditions was found")
            }
            Termination::MaxIterations => write!(f, "maximum number of iterations reached"),
        }
    }
}

/// Outcome of a fit. The accepted iterate itself is written back into the
/// caller's parameter slice.
#[derive(Debug, Clone)]
pub struct FitReport<F> {
    /// Outer iterations performed.
    pub iterations: usize,
    /// `Σᵢ rᵢ(x)²` at the iterate the final iteration started from.
    pub residual_norm2: F,
    /// Max norm of the gradient at the final iterate.
    pub gradient_max: F,
    /// Why the solver stopped.
    pub termination: Termination,
}

/// Minimize `½·Σᵢ rᵢ(x)²` with the identity parameter transform and
/// default configuration.
///
/// `params` holds the initial iterate on input and the solution on output.
/// The solver stops when the gradient max norm drops below `tolerance`,
/// when the decrease stays below `tolerance` for 15 consecutive
/// iterations, on line-search failure, or at the iteration cap.
pub fn gn_sbfgs_min<F, R>(tolerance: F, params: &mut [F], residuals: &[R]) -> FitReport<F>
where
    F: Float,
    MDiff<F>: Scalar<F>,
    SDiff<F>: Scalar<F>,
    R: Residual<F>,
{
    gn_sbfgs_min_config(
        tolerance,
        params,
        residuals,
        IdentityTransform,
        &FitConfig::default(),
    )
}

/// [`gn_sbfgs_min`] with an explicit parameter transform and configuration.
pub fn gn_sbfgs_min_config<F, R, P>(
    tolerance: F,
    params: &mut [F],
    residuals: &[R],
    mut pt: P,
    config: &FitConfig,
) -> FitReport<F>
where
    F: Float,
    MDiff<F>: Scalar<F>,
    SDiff<F>: Scalar<F>,
    R: Residual<F>,
    P: ParameterTransform<F>,
{
    let n = params.len();
    assert!(n > 0, "at least one parameter is required");
    let cn = next_multiple_of_lanes::<F>(n);
    let lanes = <F as Float>::Pack::LANES;
    let verbose = config.verbosity == Verbosity::Verbose;
    let half = F::from_f64(0.5).unwrap();

    // The context outlives every MDiff below; locals drop in reverse
    // declaration order, so it must come first.
    let _ctx = Context::<F>::new(n);
    pt.num_parameters(n);

    let mut ad_params = independents(params);
    let mut dir_params = vec![SDiff::<F>::default(); n];

    let mut g = AlignedBuf::<F>::zeroed(cn);
    let mut s = AlignedBuf::<F>::zeroed(cn);
    let mut z = AlignedBuf::<F>::zeroed(cn);
    let mut a_s = AlignedBuf::<F>::zeroed(cn);
    let mut b_mat = AlignedBuf::<F>::zeroed(n * cn);
    let mut a_mat = AlignedBuf::<F>::zeroed(n * cn);

    // Initial sweep: normr2, gradient and Gauss-Newton term.
    let mut normr2 = F::zero();
    let mut r: Vec<MDiff<F>> = Vec::with_capacity(residuals.len());
    {
        let tp = pt.apply(&ad_params);
        for res in residuals {
            let residual: MDiff<F> = res.eval(&tp);
            let rv = residual.value();
            normr2 = normr2 + rv * rv;
            blas::axpy(n, rv, residual.gradient(), 1, &mut g, 1);
            blas::syr(n, F::one(), residual.gradient(), 1, &mut b_mat, cn);
            r.push(residual);
        }
    }

    // A starts as a small multiple of the residual norm on the diagonal,
    // so B = JᵀJ + A is positive definite even for rank-deficient J.
    let diag = F::from_f64(INITIAL_DIAG).unwrap() * normr2.sqrt();
    for i in 0..n {
        a_mat[i * cn + i] = diag;
    }
    add_assign_packed(&mut b_mat, &a_mat);

    let mut small_progress = 0usize;
    let mut iterations = 0usize;
    let mut gradient_max = g[blas::iamax(n, &g, 1)].abs();
    let mut termination = Termination::MaxIterations;

    for k in 0..config.max_iter {
        iterations = k + 1;

        // Search direction: solve B·s = -g, falling back to steepest
        // descent when B is not positive definite.
        negate_into(&mut s, &g);
        if cholesky_solve(&mut b_mat, cn, &mut s, n).is_err() {
            negate_into(&mut s, &g);
        }

        let mut alpha = F::one();
        let f0 = SDiff::new(half * normr2, blas::dot(n, &g, 1, &s, 1));
        let found = {
            let eval_step = |a: F| -> SDiff<F> {
                for i in 0..n {
                    dir_params[i] = SDiff::new(params[i] + a * s[i], s[i]);
                }
                let tp = pt.apply(&dir_params);
                let mut f = SDiff::constant(F::zero());
                for res in residuals {
                    let rv: SDiff<F> = res.eval(&tp);
                    f += rv * rv;
                }
                f * half
            };
            line_search(f0, eval_step, &mut alpha)
        };

        if !found {
            if verbose {
                info!("{}", Termination::LineSearchFailed);
            }
            termination = Termination::LineSearchFailed;
            break;
        }

        // Accept: scale the direction by the step length and move.
        blas::scal(n, alpha, &mut s, 1);
        for i in 0..n {
            let pi = params[i] + s[i];
            params[i] = pi;
            ad_params[i].set_independent(pi, i);
        }

        // Re-evaluate at the new point. The same pass accumulates the new
        // gradient, the Gauss-Newton term and the secant accumulator
        // z = Σ rᵢ·(∇rᵢ(x₁) − ∇rᵢ(x₀)) from the retained residuals.
        let mut new_normr2 = F::zero();
        fill_packed(&mut b_mat, F::zero());
        fill_packed(&mut g, F::zero());
        fill_packed(&mut z, F::zero());
        {
            let tp = pt.apply(&ad_params);
            for (i, res) in residuals.iter().enumerate() {
                let residual: MDiff<F> = res.eval(&tp);
                let rv = residual.value();
                new_normr2 = new_normr2 + rv * rv;

                let rp = <F as Float>::Pack::splat(rv);
                let rd = residual.gradient();
                let r0d = r[i].gradient();
                let mut off = 0;
                while off < cn {
                    let d1 = <F as Float>::Pack::load(&rd[off..]);
                    let d0 = <F as Float>::Pack::load(&r0d[off..]);
                    (<F as Float>::Pack::load(&g[off..]) + rp * d1).store(&mut g[off..]);
                    (<F as Float>::Pack::load(&z[off..]) + rp * (d1 - d0)).store(&mut z[off..]);
                    off += lanes;
                }

                blas::syr(n, F::one(), rd, 1, &mut b_mat, cn);
                r[i] = residual;
            }
        }

        // The secant absorbs the residual rescaling before zs is formed.
        blas::scal(n, (new_normr2 / normr2).sqrt(), &mut z, 1);

        let delta = half * (normr2 - new_normr2);
        if delta < tolerance {
            small_progress += 1;
        } else {
            small_progress = 0;
        }

        let imax = blas::iamax(n, &g, 1);
        gradient_max = g[imax].abs();
        let progress = if verbose {
            format!(
                "itr: {:<6} r: {:<14.6e} d: {:<14.6e} g: {:<14.6e}",
                k + 1,
                half * normr2,
                delta,
                gradient_max
            )
        } else {
            String::new()
        };

        if small_progress == STAGNATION_LIMIT {
            if verbose {
                info!("{}", progress);
                info!("{}", Termination::Stagnation);
            }
            termination = Termination::Stagnation;
            break;
        }

        if gradient_max < tolerance {
            if verbose {
                info!("{}", progress);
                info!("{}", Termination::GradientTolerance);
            }
            termination = Termination::GradientTolerance;
            break;
        }

        normr2 = new_normr2;

        // Structured-BFGS update of the correction A when the secant
        // curvature is trustworthy, Gauss-Newton regularization otherwise.
        let zs = blas::dot(n, &z, 1, &s, 1);
        let ss = blas::dot(n, &s, 1, &s, 1);
        if zs / ss >= F::from_f64(CURVATURE_MIN).unwrap() {
            if verbose {
                info!("{} H: SBFGS", progress);
            }
            blas::symv(n, F::one(), &a_mat, cn, &s, 1, F::zero(), &mut a_s, 1);
            let s_as = blas::dot(n, &s, 1, &a_s, 1);
            blas::syr(n, -F::one() / s_as, &a_s, 1, &mut a_mat, cn);
            blas::syr(n, F::one() / zs, &z, 1, &mut a_mat, cn);
            add_assign_packed(&mut b_mat, &a_mat);
        } else {
            if verbose {
                info!("{} H: GN", progress);
            }
            let normr = normr2.sqrt();
            for i in 0..n {
                b_mat[i * cn + i] = b_mat[i * cn + i] + normr;
            }
        }
    }

    if verbose && termination == Termination::MaxIterations {
        info!("{}", Termination::MaxIterations);
    }

    FitReport {
        iterations,
        residual_norm2: normr2,
        gradient_max,
        termination,
    }
}
