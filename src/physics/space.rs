use crate::discretization::MeshError;
use crate::discretization::mesh::Mesh;
use nalgebra::{DVector, Matrix3, Vector3};

/// Geometric data of one linear tetrahedral element.
#[derive(Clone, Debug)]
pub struct P1Element {
    pub dofs: [usize; 4],
    pub volume: f64,
    /// Constant gradients of the four barycentric basis functions.
    pub gradients: [Vector3<f64>; 4],
}

impl P1Element {
    fn from_cell(mesh: &Mesh, cell: usize) -> Result<Self, MeshError> {
        let [p0, p1, p2, p3] = mesh.cell_points(cell);
        let e1 = p1 - p0;
        let e2 = p2 - p0;
        let e3 = p3 - p0;
        let jacobian = Matrix3::new(
            e1.x, e2.x, e3.x, //
            e1.y, e2.y, e3.y, //
            e1.z, e2.z, e3.z,
        );
        let volume = jacobian.determinant().abs() / 6.0;
        let inverse = jacobian
            .try_inverse()
            .filter(|_| volume > 0.0)
            .ok_or(MeshError::DegenerateCell { cell, volume })?;

        // Rows of J^-1 are the gradients of lambda_1..lambda_3.
        let g1 = inverse.row(0).transpose();
        let g2 = inverse.row(1).transpose();
        let g3 = inverse.row(2).transpose();
        let g0 = -(g1 + g2 + g3);

        Ok(Self {
            dofs: mesh.cells[cell].vertices,
            volume,
            gradients: [g0, g1, g2, g3],
        })
    }

    /// Consistent mass matrix: `V/20 * (1 + delta_ij)`.
    pub fn mass(&self) -> [[f64; 4]; 4] {
        let mut m = [[self.volume / 20.0; 4]; 4];
        for (i, row) in m.iter_mut().enumerate() {
            row[i] *= 2.0;
        }
        m
    }

    /// Stiffness matrix: `V * grad(phi_i) . grad(phi_j)`.
    pub fn stiffness(&self) -> [[f64; 4]; 4] {
        let mut k = [[0.0; 4]; 4];
        for i in 0..4 {
            for j in 0..4 {
                k[i][j] = self.volume * self.gradients[i].dot(&self.gradients[j]);
            }
        }
        k
    }
}

/// Scalar, piecewise-linear, vertex-based function space on a mesh.
///
/// One degree of freedom per mesh vertex; the degree is fixed.
pub struct FunctionSpace<'m> {
    mesh: &'m Mesh,
    elements: Vec<P1Element>,
}

impl<'m> FunctionSpace<'m> {
    pub fn new(mesh: &'m Mesh) -> Result<Self, MeshError> {
        if mesh.num_cells() == 0 {
            return Err(MeshError::Empty);
        }
        let elements = (0..mesh.num_cells())
            .map(|c| P1Element::from_cell(mesh, c))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { mesh, elements })
    }

    pub fn mesh(&self) -> &'m Mesh {
        self.mesh
    }

    pub fn elements(&self) -> &[P1Element] {
        &self.elements
    }

    pub fn dim(&self) -> usize {
        self.mesh.num_nodes()
    }

    /// Nodal interpolation of `f`.
    pub fn interpolate(&self, f: impl Fn([f64; 3]) -> f64) -> TemperatureField {
        TemperatureField::from_vector(DVector::from_iterator(
            self.dim(),
            self.mesh.nodes.iter().map(|n| f(n.position)),
        ))
    }

    pub fn constant(&self, value: f64) -> TemperatureField {
        TemperatureField::from_vector(DVector::from_element(self.dim(), value))
    }
}

/// Temperature at every mesh vertex at one instant.
#[derive(Clone, Debug, PartialEq)]
pub struct TemperatureField {
    values: DVector<f64>,
}

impl TemperatureField {
    pub fn from_vector(values: DVector<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &DVector<f64> {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut DVector<f64> {
        &mut self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Overwrite this field with the values of `other` (value copy).
    pub fn assign(&mut self, other: &TemperatureField) {
        self.values.copy_from(&other.values);
    }

    /// Index and value of the hottest vertex; the first one wins on ties.
    pub fn argmax(&self) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &v) in self.values.iter().enumerate() {
            if best.is_none_or(|(_, b)| v > b) {
                best = Some((i, v));
            }
        }
        best
    }

    pub fn max(&self) -> f64 {
        self.values.max()
    }

    pub fn min(&self) -> f64 {
        self.values.min()
    }
}
