//! Least squares solver.
//!
//! The seasonal-trend model is linear in its coefficients, so fitting reduces to
//! a single regression problem:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2 + Σ_j λ_j β_j^2
//! ```
//!
//! The ridge term is only applied to the seasonal columns. It is implemented by
//! appending `sqrt(λ_j) e_j` rows to the design matrix, which keeps the solve a
//! plain least squares problem.
//!
//! Implementation choices:
//! - We use SVD to solve the least-squares problem robustly even when the design
//!   matrix is tall or rank-deficient (e.g. one observation per year makes the
//!   seasonal columns nearly collinear with the intercept).
//! - The parameter dimension is tiny (2 + 2·order columns), so SVD cost is negligible.

use nalgebra::{DMatrix, DVector};

/// Solution of a (possibly ridge-augmented) least squares problem.
#[derive(Debug, Clone)]
pub struct LeastSquares {
    pub beta: DVector<f64>,
    /// `(XᵀX + Λ)⁻¹`, the unscaled coefficient covariance.
    pub covariance: DMatrix<f64>,
}

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve with a per-column ridge penalty and return the coefficient covariance.
///
/// `penalty[j]` is `λ_j` for column `j` (zero for unpenalized columns).
pub fn solve_ridge(x: &DMatrix<f64>, y: &DVector<f64>, penalty: &[f64]) -> Option<LeastSquares> {
    let (n, p) = x.shape();
    if penalty.len() != p {
        return None;
    }

    let penalized: Vec<(usize, f64)> = penalty
        .iter()
        .enumerate()
        .filter(|(_, l)| **l > 0.0)
        .map(|(j, l)| (j, l.sqrt()))
        .collect();

    let rows = n + penalized.len();
    let mut xa = DMatrix::<f64>::zeros(rows, p);
    let mut ya = DVector::<f64>::zeros(rows);
    xa.rows_mut(0, n).copy_from(x);
    ya.rows_mut(0, n).copy_from(y);
    for (k, (j, sl)) in penalized.iter().enumerate() {
        xa[(n + k, *j)] = *sl;
    }

    let beta = solve_least_squares(&xa, &ya)?;
    let gram = xa.transpose() * &xa;
    let covariance = gram.pseudo_inverse(1e-12).ok()?;
    if covariance.iter().any(|v| !v.is_finite()) {
        return None;
    }

    Some(LeastSquares { beta, covariance })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn zero_penalty_matches_plain_solve() {
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0]);
        let y = DVector::from_row_slice(&[1.0, 3.1, 4.9, 7.0]);

        let plain = solve_least_squares(&x, &y).unwrap();
        let ridge = solve_ridge(&x, &y, &[0.0, 0.0]).unwrap();
        assert!((plain - &ridge.beta).norm() < 1e-9);
        assert_eq!(ridge.covariance.shape(), (2, 2));
        // Diagonal of (XᵀX)⁻¹ is positive for a full-rank design.
        assert!(ridge.covariance[(0, 0)] > 0.0 && ridge.covariance[(1, 1)] > 0.0);
    }

    #[test]
    fn penalty_shrinks_penalized_column() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 1.0, 1.0, -1.0, 1.0, 1.0]);
        let y = DVector::from_row_slice(&[3.0, -1.0, 3.0]);

        let free = solve_ridge(&x, &y, &[0.0, 0.0]).unwrap();
        let shrunk = solve_ridge(&x, &y, &[0.0, 10.0]).unwrap();
        assert!(shrunk.beta[1].abs() < free.beta[1].abs());
        assert!(solve_ridge(&x, &y, &[0.0]).is_none());
    }
}
