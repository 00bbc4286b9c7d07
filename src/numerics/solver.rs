use nalgebra::DVector;
use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("linear solve failed: {0}")]
    LinearSolveFailed(String),
    #[error(
        "conjugate gradient failed to converge after {iterations} iterations \
         (residual {residual:.3e})"
    )]
    NonConvergence { iterations: u32, residual: f64 },
}

pub struct SolverResult {
    pub solution: DVector<f64>,
    pub iterations: u32,
    pub final_residual: f64,
}

pub(crate) fn log_iteration(i: u32, max_iter: u32, res_norm: f64, fraction: f64, logging: bool) {
    if !logging {
        return;
    }
    if i == 0 {
        println!("{i:>4} | {res_norm:>8.3e} | {fraction:>8.3e}");
    } else {
        print!("\x1B[1F\x1B[2K");
        println!("{i:>4}/{max_iter} | {res_norm:>8.3e} | {fraction:>9.3e}");
    }
    io::stdout().flush().ok();
}
