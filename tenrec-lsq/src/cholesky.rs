use num_traits::Float;
use thiserror::Error;

use crate::blas::{self, Trans};

/// Errors from the dense linear algebra layer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LinalgError {
    /// The trailing submatrix starting at the given 1-based pivot is not
    /// positive definite.
    #[error("matrix is not positive definite at pivot {0}")]
    NotPositiveDefinite(usize),
}

/// Solve `A·x = b` for symmetric positive definite `A` by an in-place
/// Cholesky factorization.
///
/// `a` holds the lower triangle of `A` row-major with leading dimension
/// `lda >= n`; `b` holds the right-hand side. On success `b` holds the
/// solution and `a` the lower factor `L`. On failure the factorization
/// stops at the offending pivot: `a` is partially overwritten and must be
/// treated as destroyed, while `b` is untouched.
pub fn cholesky_solve<F: Float>(
    a: &mut [F],
    lda: usize,
    b: &mut [F],
    n: usize,
) -> Result<(), LinalgError> {
    assert!(n > 0);
    assert!(lda >= n);
    debug_assert!(a.len() >= (n - 1) * lda + n);
    debug_assert!(b.len() >= n);

    // First column needs only the root and the scaling.
    let v = a[0];
    if v < F::zero() {
        return Err(LinalgError::NotPositiveDefinite(1));
    }
    a[0] = v.sqrt();
    if n > 1 {
        blas::scal(n - 1, F::one() / a[0], &mut a[lda..], lda);
    }

    for k in 1..n {
        // Subtract the contribution of the finished columns from column k.
        // One dot per subdiagonal row; same sums as the textbook gemv.
        for i in k..n {
            let s = blas::dot(k, &a[i * lda..], 1, &a[k * lda..], 1);
            a[i * lda + k] = a[i * lda + k] - s;
        }

        let v = a[k * lda + k];
        if v < F::zero() {
            return Err(LinalgError::NotPositiveDefinite(k + 1));
        }
        a[k * lda + k] = v.sqrt();

        if k + 1 < n {
            blas::scal(
                n - k - 1,
                F::one() / a[k * lda + k],
                &mut a[(k + 1) * lda + k..],
                lda,
            );
        }
    }

    // L·y = b, then Lᵀ·x = y, overwriting b with the solution.
    blas::trsv(Trans::NoTrans, n, a, lda, b, 1);
    blas::trsv(Trans::Trans, n, a, lda, b, 1);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blas::Side;

    // Classic SPD example with an exact integer factor:
    //   A = [[4, 12, -16], [12, 37, -43], [-16, -43, 98]]
    //   L = [[2, 0, 0], [6, 1, 0], [-8, 5, 3]]
    fn spd_3x3() -> Vec<f64> {
        vec![4.0, 0.0, 0.0, 12.0, 37.0, 0.0, -16.0, -43.0, 98.0]
    }

    #[test]
    fn solves_and_factors() {
        let a = spd_3x3();
        let mut l = a.clone();
        let x = [4.0, 5.0, 6.0];
        let mut b = vec![0.0; 3];
        blas::symv(3, 1.0, &a, 3, &x, 1, 0.0, &mut b, 1);

        cholesky_solve(&mut l, 3, &mut b, 3).unwrap();

        for i in 0..3 {
            assert!((b[i] - x[i]).abs() < 1e-10, "b[{}] = {}", i, b[i]);
        }
        assert!((l[0] - 2.0).abs() < 1e-12);
        assert!((l[3] - 6.0).abs() < 1e-12);
        assert!((l[4] - 1.0).abs() < 1e-12);
        assert!((l[6] + 8.0).abs() < 1e-12);
        assert!((l[7] - 5.0).abs() < 1e-12);
        assert!((l[8] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn factor_reconstructs_input() {
        let a = spd_3x3();
        let mut l = a.clone();
        let mut b = vec![1.0, 2.0, 3.0];
        cholesky_solve(&mut l, 3, &mut b, 3).unwrap();

        // L·Lᵀ must reproduce the lower triangle of A.
        let factor = l.clone();
        blas::trmm(Side::Right, Trans::Trans, 3, 3, 1.0, &factor, 3, &mut l, 3);
        for i in 0..3 {
            for j in 0..=i {
                assert!(
                    (l[i * 3 + j] - a[i * 3 + j]).abs() < 1e-10,
                    "L·Lᵀ[{},{}] = {}",
                    i,
                    j,
                    l[i * 3 + j]
                );
            }
        }
    }

    #[test]
    fn reports_first_negative_pivot() {
        let mut a = vec![-1.0, 0.0, 0.0, 1.0];
        let mut b = vec![1.0, 1.0];
        assert_eq!(
            cholesky_solve(&mut a, 2, &mut b, 2),
            Err(LinalgError::NotPositiveDefinite(1))
        );
        assert_eq!(b, vec![1.0, 1.0]);

        // Indefinite with a clean first column: fails at pivot 2.
        let mut a = vec![1.0, 0.0, 0.0, -1.0];
        let mut b = vec![1.0, 1.0];
        assert_eq!(
            cholesky_solve(&mut a, 2, &mut b, 2),
            Err(LinalgError::NotPositiveDefinite(2))
        );
        assert_eq!(b, vec![1.0, 1.0]);
    }

    #[test]
    fn leading_dimension_larger_than_n() {
        // Same system embedded with lda = 4.
        let mut a = vec![0.0; 12];
        let dense = spd_3x3();
        for i in 0..3 {
            for j in 0..=i {
                a[i * 4 + j] = dense[i * 3 + j];
            }
        }
        let x = [1.0, -2.0, 0.5];
        let mut b = vec![0.0; 3];
        blas::symv(3, 1.0, &dense, 3, &x, 1, 0.0, &mut b, 1);
        cholesky_solve(&mut a, 4, &mut b, 3).unwrap();
        for i in 0..3 {
            assert!((b[i] - x[i]).abs() < 1e-10);
        }
    }
}
