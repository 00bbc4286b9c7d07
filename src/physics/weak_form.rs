use crate::numerics::sparse::spmv;
use crate::physics::bc::DirichletBC;
use crate::physics::space::{FunctionSpace, TemperatureField};
use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// Assemble `sum_e (mass_weight * M_e + stiffness_weight * K_e)`.
pub fn assemble(space: &FunctionSpace, mass_weight: f64, stiffness_weight: f64) -> CsrMatrix<f64> {
    let n = space.dim();
    let mut coo = CooMatrix::new(n, n);
    coo.reserve(16 * space.elements().len());

    for el in space.elements() {
        let m = el.mass();
        let k = el.stiffness();
        for i in 0..4 {
            for j in 0..4 {
                let v = mass_weight * m[i][j] + stiffness_weight * k[i][j];
                if v != 0.0 {
                    coo.push(el.dofs[i], el.dofs[j], v);
                }
            }
        }
    }

    CsrMatrix::from(&coo)
}

pub fn assemble_mass(space: &FunctionSpace) -> CsrMatrix<f64> {
    assemble(space, 1.0, 0.0)
}

pub fn assemble_stiffness(space: &FunctionSpace) -> CsrMatrix<f64> {
    assemble(space, 0.0, 1.0)
}

/// Backward-Euler form of the heat equation with a volumetric source:
///
/// `T v dx + alpha*dt grad(T).grad(v) dx = (T_prev + alpha*dt q) v dx`
///
/// The left-hand side depends only on `dt`, so it is assembled once per run.
/// Dirichlet rows and columns are eliminated symmetrically; the removed
/// column contributions are kept in `lift` and moved to the right-hand side.
pub struct BackwardEulerSystem {
    pub matrix: CsrMatrix<f64>,
    mass: CsrMatrix<f64>,
    lift: DVector<f64>,
    constrained: Vec<bool>,
    boundary_value: f64,
    /// `alpha * dt`
    source_weight: f64,
}

impl BackwardEulerSystem {
    pub fn new(space: &FunctionSpace, bc: &DirichletBC, diffusivity: f64, dt: f64) -> Self {
        let weight = diffusivity * dt;
        let mut matrix = assemble(space, 1.0, weight);
        let mass = assemble_mass(space);
        let constrained = bc.constrained_dofs(space.mesh());
        let lift = eliminate_dirichlet(&mut matrix, &constrained, bc.value);

        Self {
            matrix,
            mass,
            lift,
            constrained,
            boundary_value: bc.value,
            source_weight: weight,
        }
    }

    pub fn constrained(&self) -> &[bool] {
        &self.constrained
    }

    pub fn num_constrained(&self) -> usize {
        self.constrained.iter().filter(|c| **c).count()
    }

    /// Right-hand side `M (T_prev + alpha*dt*q)` with the boundary lifted out.
    pub fn rhs(&self, previous: &TemperatureField, source: &DVector<f64>) -> DVector<f64> {
        let load = previous.values() + source * self.source_weight;
        let mut b = spmv(&self.mass, &load);
        for (i, fixed) in self.constrained.iter().enumerate() {
            if *fixed {
                b[i] = self.boundary_value;
            } else {
                b[i] -= self.lift[i];
            }
        }
        b
    }
}

/// Replace constrained rows/columns by the identity and return the column
/// contributions `A[:, c] * g` for the free rows.
fn eliminate_dirichlet(
    matrix: &mut CsrMatrix<f64>,
    constrained: &[bool],
    value: f64,
) -> DVector<f64> {
    let mut lift = DVector::zeros(matrix.nrows());
    for (i, mut row) in matrix.row_iter_mut().enumerate() {
        let (cols, vals) = row.cols_and_values_mut();
        for (&j, a) in cols.iter().zip(vals.iter_mut()) {
            if constrained[i] {
                *a = if i == j { 1.0 } else { 0.0 };
            } else if constrained[j] {
                lift[i] += *a * value;
                *a = 0.0;
            }
        }
    }
    lift
}
