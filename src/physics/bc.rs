use std::sync::Arc;

use crate::discretization::mesh::Mesh;
use crate::physics::space::TemperatureField;

/// Geometric point in space.
#[derive(Clone, Copy, Debug)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Outward pointing unit normal.
#[derive(Clone, Copy, Debug)]
pub struct Normal {
    pub nx: f64,
    pub ny: f64,
    pub nz: f64,
}

/// `|a - b| < tol`, the on-face test used by boundary predicates.
#[inline]
pub fn near(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() < tol
}

#[derive(Clone)]
pub enum BoundarySelector {
    /// Every boundary facet.
    All,
    /// Facets whose centroid and vertices all satisfy the predicate.
    Predicate(Arc<dyn Fn(Point, Normal) -> bool + Send + Sync>),
}

impl BoundarySelector {
    fn selects(&self, p: Point, n: Normal) -> bool {
        match self {
            BoundarySelector::All => true,
            BoundarySelector::Predicate(pred) => pred(p, n),
        }
    }
}

/// Fixed-value condition on the boundary facets picked by `on`.
///
/// A facet is selected only when the predicate holds at its centroid and at
/// each of its vertices. A vertex is constrained when it belongs to at least
/// one selected facet, so vertices on the rim of a free face stay free.
#[derive(Clone)]
pub struct DirichletBC {
    pub value: f64,
    pub on: BoundarySelector,
}

impl DirichletBC {
    pub fn new(value: f64, on: BoundarySelector) -> Self {
        Self { value, on }
    }

    /// Ambient temperature everywhere except the heated top face `z = z_top`
    /// and the downstream end face `x = x_max`, which stay open.
    pub fn ambient_open_top_and_outlet(ambient: f64, z_top: f64, x_max: f64, tol: f64) -> Self {
        Self::new(
            ambient,
            BoundarySelector::Predicate(Arc::new(move |p, _| {
                !near(p.z, z_top, tol) && !near(p.x, x_max, tol)
            })),
        )
    }

    /// Per-vertex flag: `true` for constrained degrees of freedom.
    pub fn constrained_dofs(&self, mesh: &Mesh) -> Vec<bool> {
        let mut constrained = vec![false; mesh.num_nodes()];
        for facet in mesh.boundary_facets() {
            let (c, n) = mesh.facet_geometry(&facet);
            let n = Normal {
                nx: n.x,
                ny: n.y,
                nz: n.z,
            };
            let on_facet = |p: Point| self.on.selects(p, n);
            let selected = on_facet(Point {
                x: c.x,
                y: c.y,
                z: c.z,
            }) && facet.vertices.iter().all(|&v| {
                let [x, y, z] = mesh.nodes[v].position;
                on_facet(Point { x, y, z })
            });
            if selected {
                for v in facet.vertices {
                    constrained[v] = true;
                }
            }
        }
        constrained
    }

    /// Write the boundary value into the constrained slots of `field`.
    pub fn apply(&self, constrained: &[bool], field: &mut TemperatureField) {
        for (value, _) in field
            .values_mut()
            .iter_mut()
            .zip(constrained)
            .filter(|(_, c)| **c)
        {
            *value = self.value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::generator::box_mesh;

    #[test]
    fn top_and_outlet_faces_stay_free() {
        let mesh = box_mesh([-1.0, -1.0, 0.0], [3.0, 1.0, -2.0], [4, 2, 2]);
        let bc = DirichletBC::ambient_open_top_and_outlet(25.0, 0.0, 3.0, 1e-6);
        let constrained = bc.constrained_dofs(&mesh);

        for (node, fixed) in mesh.nodes.iter().zip(&constrained) {
            let [x, y, z] = node.position;
            let on_fixed_face = near(x, -1.0, 1e-9)
                || near(y.abs(), 1.0, 1e-9)
                || near(z, -2.0, 1e-9);
            let on_open_face = near(z, 0.0, 1e-9) || near(x, 3.0, 1e-9);
            assert_eq!(
                *fixed,
                on_fixed_face && !on_open_face,
                "node at {:?}",
                node.position
            );
        }
    }

    #[test]
    fn rims_of_open_faces_stay_free() {
        let mesh = box_mesh([-1.0, -1.0, 0.0], [3.0, 1.0, -2.0], [4, 2, 2]);
        let bc = DirichletBC::ambient_open_top_and_outlet(25.0, 0.0, 3.0, 1e-6);
        let constrained = bc.constrained_dofs(&mesh);

        let top_or_outlet: Vec<bool> = mesh
            .nodes
            .iter()
            .zip(&constrained)
            .filter(|(n, _)| near(n.position[2], 0.0, 1e-9) || near(n.position[0], 3.0, 1e-9))
            .map(|(_, c)| *c)
            .collect();
        // Top face 5x3 and outlet face 3x3 share a row of 3.
        assert_eq!(top_or_outlet.len(), 15 + 9 - 3);
        assert!(top_or_outlet.iter().all(|c| !c));
    }

    #[test]
    fn apply_sets_only_constrained_values() {
        let mesh = box_mesh([0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2, 2, 2]);
        let bc = DirichletBC::new(7.0, BoundarySelector::All);
        let constrained = bc.constrained_dofs(&mesh);
        let mut field = TemperatureField::from_vector(nalgebra::DVector::zeros(mesh.num_nodes()));
        bc.apply(&constrained, &mut field);

        let fixed = field.values().iter().filter(|v| **v == 7.0).count();
        // 27 nodes, only the centre node is interior.
        assert_eq!(fixed, 26);
        assert_eq!(constrained.iter().filter(|c| !**c).count(), 1);
    }
}
