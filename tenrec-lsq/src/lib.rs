//! Nonlinear least squares by a Gauss–Newton / structured-BFGS hybrid.
//!
//! Residuals are differentiated exactly by the [`tenrec`] forward-mode AD
//! engine; the solver globalizes with a weak-Wolfe line search and falls
//! back to steepest descent when the normal matrix loses definiteness.

pub mod blas;
pub mod cholesky;
pub mod line_search;
pub mod residual;
pub mod solver;

pub use cholesky::{cholesky_solve, LinalgError};
pub use line_search::line_search;
pub use residual::{IdentityTransform, ParameterTransform, Residual};
pub use solver::{
    gn_sbfgs_min, gn_sbfgs_min_config, FitConfig, FitReport, Termination, Verbosity,
};
