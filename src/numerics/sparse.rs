use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;

use crate::numerics::Convergence;
use crate::numerics::solver::{SolverError, SolverResult, log_iteration};
use crate::numerics::timing::record_linear_solve;

/// `y = A x` for a CSR matrix.
pub fn spmv(a: &CsrMatrix<f64>, x: &DVector<f64>) -> DVector<f64> {
    let mut y = DVector::zeros(a.nrows());
    spmv_into(a, x, &mut y);
    y
}

fn spmv_into(a: &CsrMatrix<f64>, x: &DVector<f64>, y: &mut DVector<f64>) {
    for (i, row) in a.row_iter().enumerate() {
        y[i] = row
            .col_indices()
            .iter()
            .zip(row.values())
            .map(|(&j, v)| v * x[j])
            .sum();
    }
}

/// Diagonal of a CSR matrix; missing entries read as zero.
pub fn diagonal(a: &CsrMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(
        a.nrows(),
        a.row_iter().enumerate().map(|(i, row)| {
            row.col_indices()
                .iter()
                .position(|&j| j == i)
                .map(|k| row.values()[k])
                .unwrap_or(0.0)
        }),
    )
}

/// Jacobi-preconditioned conjugate gradients for symmetric positive
/// definite systems.
#[derive(Clone, Debug)]
pub struct ConjugateGradientSolver {
    pub convergence: Convergence,
    pub max_iterations: u32,
    pub logging: bool,
}

impl Default for ConjugateGradientSolver {
    fn default() -> Self {
        Self {
            convergence: Convergence::default(),
            max_iterations: 5000,
            logging: false,
        }
    }
}

impl ConjugateGradientSolver {
    pub fn solve(
        &self,
        a: &CsrMatrix<f64>,
        b: &DVector<f64>,
        initial_guess: DVector<f64>,
    ) -> Result<SolverResult, SolverError> {
        record_linear_solve(|| self.solve_inner(a, b, initial_guess))
    }

    fn solve_inner(
        &self,
        a: &CsrMatrix<f64>,
        b: &DVector<f64>,
        initial_guess: DVector<f64>,
    ) -> Result<SolverResult, SolverError> {
        let n = b.len();
        if a.nrows() != n || a.ncols() != n || initial_guess.len() != n {
            return Err(SolverError::LinearSolveFailed(format!(
                "dimension mismatch: matrix {}x{}, rhs {}, guess {}",
                a.nrows(),
                a.ncols(),
                n,
                initial_guess.len()
            )));
        }
        if !b.iter().all(|v| v.is_finite()) {
            return Err(SolverError::LinearSolveFailed(
                "right-hand side contains NaN or Inf".into(),
            ));
        }

        let d = diagonal(a);
        if let Some(row) = d.iter().position(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(SolverError::LinearSolveFailed(format!(
                "matrix is not positive definite (diagonal {:.3e} at row {row})",
                d[row]
            )));
        }
        let inv_d = d.map(|v| 1.0 / v);

        let mut x = initial_guess;
        let mut ap = DVector::zeros(n);
        spmv_into(a, &x, &mut ap);
        let mut r = b - &ap;

        let b_norm = self.convergence.norm(b);
        let mut res_norm = self.convergence.norm(&r);
        if !(b_norm.is_finite() && res_norm.is_finite()) {
            return Err(SolverError::LinearSolveFailed(format!(
                "initial norms overflow (|b| = {b_norm:.3e}, |r0| = {res_norm:.3e})"
            )));
        }
        if self.logging {
            println!("{n} unknowns, |b| = {b_norm:.3e}");
            println!("    Iter   | Residual |  Fraction");
        }
        if self.convergence.check_tolerance(res_norm, b_norm) {
            return Ok(SolverResult {
                solution: x,
                iterations: 0,
                final_residual: res_norm,
            });
        }

        let mut z = r.component_mul(&inv_d);
        let mut p = z.clone();
        let mut rz = r.dot(&z);

        for i in 1..=self.max_iterations {
            spmv_into(a, &p, &mut ap);
            let p_ap = p.dot(&ap);
            if !(p_ap.is_finite() && p_ap > 0.0) {
                return Err(SolverError::LinearSolveFailed(format!(
                    "breakdown at iteration {i} (p.Ap = {p_ap:.3e}); matrix singular or indefinite"
                )));
            }

            let alpha = rz / p_ap;
            x.axpy(alpha, &p, 1.0);
            r.axpy(-alpha, &ap, 1.0);

            res_norm = self.convergence.norm(&r);
            if !res_norm.is_finite() {
                return Err(SolverError::LinearSolveFailed(format!(
                    "residual became non-finite at iteration {i}"
                )));
            }
            log_iteration(i, self.max_iterations, res_norm, res_norm / b_norm, self.logging);

            if self.convergence.check_tolerance(res_norm, b_norm) {
                return Ok(SolverResult {
                    solution: x,
                    iterations: i,
                    final_residual: res_norm,
                });
            }

            z = r.component_mul(&inv_d);
            let rz_new = r.dot(&z);
            let beta = rz_new / rz;
            rz = rz_new;
            p.axpy(1.0, &z, beta);
        }

        Err(SolverError::NonConvergence {
            iterations: self.max_iterations,
            residual: res_norm,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra_sparse::CooMatrix;

    fn laplacian_1d(n: usize, shift: f64) -> CsrMatrix<f64> {
        let mut coo = CooMatrix::new(n, n);
        for i in 0..n {
            coo.push(i, i, 2.0 + shift);
            if i > 0 {
                coo.push(i, i - 1, -1.0);
            }
            if i + 1 < n {
                coo.push(i, i + 1, -1.0);
            }
        }
        CsrMatrix::from(&coo)
    }

    #[test]
    fn solves_spd_tridiagonal_system() {
        let a = laplacian_1d(50, 0.1);
        let exact = DVector::from_fn(50, |i, _| (i as f64 * 0.3).sin());
        let b = spmv(&a, &exact);

        let solver = ConjugateGradientSolver::default();
        let result = solver.solve(&a, &b, DVector::zeros(50)).expect("CG converges");
        assert!((result.solution - exact).amax() < 1e-8);
        assert!(result.iterations > 0);
        assert!(result.final_residual <= 1e-10 * b.norm());
    }

    #[test]
    fn exact_initial_guess_returns_immediately() {
        let a = laplacian_1d(10, 1.0);
        let x = DVector::from_element(10, 25.0);
        let b = spmv(&a, &x);
        let result = ConjugateGradientSolver::default()
            .solve(&a, &b, x.clone())
            .unwrap();
        assert_eq!(result.iterations, 0);
        assert_eq!(result.solution, x);
    }

    #[test]
    fn singular_matrix_is_reported() {
        let mut coo = CooMatrix::new(3, 3);
        coo.push(0, 0, 1.0);
        coo.push(1, 1, 1.0);
        // Row 2 has no diagonal entry.
        coo.push(2, 0, 0.0);
        let a = CsrMatrix::from(&coo);
        let b = DVector::from_element(3, 1.0);
        let err = ConjugateGradientSolver::default()
            .solve(&a, &b, DVector::zeros(3))
            .err()
            .expect("must fail");
        assert!(matches!(err, SolverError::LinearSolveFailed(_)));
    }

    #[test]
    fn overflowing_rhs_norm_is_a_failure() {
        let mut coo = CooMatrix::new(4, 4);
        for i in 0..4 {
            coo.push(i, i, 2.0);
        }
        let a = CsrMatrix::from(&coo);
        let b = DVector::from_element(4, 1e200);
        let err = ConjugateGradientSolver::default()
            .solve(&a, &b, DVector::zeros(4))
            .err()
            .expect("|b| overflows");
        assert!(matches!(err, SolverError::LinearSolveFailed(_)));
    }

    #[test]
    fn iteration_cap_reports_non_convergence() {
        let a = laplacian_1d(200, 0.0);
        let b = DVector::from_element(200, 1.0);
        let solver = ConjugateGradientSolver {
            max_iterations: 3,
            ..Default::default()
        };
        let err = solver.solve(&a, &b, DVector::zeros(200)).err().unwrap();
        assert!(matches!(err, SolverError::NonConvergence { iterations: 3, .. }));
    }

    #[test]
    fn diagonal_reads_missing_entries_as_zero() {
        let mut coo = CooMatrix::new(2, 2);
        coo.push(0, 0, 4.0);
        coo.push(1, 0, 1.0);
        let d = diagonal(&CsrMatrix::from(&coo));
        assert_eq!(d.as_slice(), &[4.0, 0.0]);
    }
}
