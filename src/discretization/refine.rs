//! Local, conforming refinement of tetrahedral meshes.
//!
//! Every edge of a marked cell is bisected. Each cell touching a bisected
//! edge, marked or not, is then split by recursive bisection that always
//! takes its longest bisected edge first (ties broken by node index). The
//! subdivision of a face therefore depends only on the face's own bisected
//! edges, so neighbouring cells always agree and no hanging nodes appear.

use super::mesh::{Cell, Mesh, Node, RefinementPass, TET_EDGES};
use glam::DVec3;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Lateral/depth band around the scan line: `|y| < half_width` and `z > -depth`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RefinementBand {
    pub half_width: f64,
    pub depth: f64,
}

impl RefinementBand {
    /// Band of `multiplier * beam_radius` in both directions.
    pub fn around_beam(beam_radius: f64, multiplier: f64) -> Self {
        Self {
            half_width: multiplier * beam_radius,
            depth: multiplier * beam_radius,
        }
    }

    #[inline]
    pub fn contains(&self, p: DVec3) -> bool {
        p.y.abs() < self.half_width && p.z > -self.depth
    }

    /// Same band enlarged by `margin` on every open side.
    pub fn grown(&self, margin: f64) -> Self {
        Self {
            half_width: self.half_width + margin,
            depth: self.depth + margin,
        }
    }
}

/// Mark every cell whose centroid satisfies `predicate`.
pub fn mark_cells(mesh: &Mesh, predicate: impl Fn(DVec3) -> bool) -> Vec<bool> {
    (0..mesh.num_cells())
        .map(|c| predicate(mesh.cell_centroid(c)))
        .collect()
}

#[inline]
fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}

/// Bisect the marked cells, plus whatever neighbours conformity forces.
pub fn refine_marked(mesh: &Mesh, markers: &[bool]) -> Mesh {
    assert_eq!(
        markers.len(),
        mesh.num_cells(),
        "marker length ({}) must match cell count ({})",
        markers.len(),
        mesh.num_cells()
    );

    let mut nodes = mesh.nodes.clone();
    let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();

    for (cell, _) in mesh.cells.iter().zip(markers).filter(|(_, m)| **m) {
        for (i, j) in TET_EDGES {
            let key = edge_key(cell.vertices[i], cell.vertices[j]);
            midpoints.entry(key).or_insert_with(|| {
                nodes.push(midpoint_node(&mesh.nodes[key.0], &mesh.nodes[key.1]));
                nodes.len() - 1
            });
        }
    }

    let mut cells = Vec::with_capacity(mesh.num_cells() + 8 * midpoints.len());
    for cell in &mesh.cells {
        bisect_recursive(cell.vertices, &nodes, &midpoints, &mut cells);
    }

    let mut refinement = mesh.refinement.clone();
    refinement.push(RefinementPass {
        marked_cells: markers.iter().filter(|m| **m).count(),
        bisected_edges: midpoints.len(),
        cells_before: mesh.num_cells(),
        cells_after: cells.len(),
    });

    Mesh {
        nodes,
        cells,
        bounds: mesh.bounds,
        base_spacing: mesh.base_spacing,
        refinement,
    }
}

fn midpoint_node(a: &Node, b: &Node) -> Node {
    let position = [0, 1, 2].map(|i| 0.5 * (a.position[i] + b.position[i]));
    let lattice = [0, 1, 2].map(|i| {
        let sum = a.lattice[i] + b.lattice[i];
        debug_assert!(sum % 2 == 0, "lattice resolution exhausted");
        sum / 2
    });
    Node { position, lattice }
}

/// Squared length computed from the endpoints in canonical order, so both
/// cells sharing an edge obtain bit-identical keys.
fn edge_length_sq(nodes: &[Node], key: (usize, usize)) -> f64 {
    let a = DVec3::from_array(nodes[key.0].position);
    let b = DVec3::from_array(nodes[key.1].position);
    a.distance_squared(b)
}

fn compare_edges(nodes: &[Node], a: (usize, usize), b: (usize, usize)) -> Ordering {
    edge_length_sq(nodes, a)
        .partial_cmp(&edge_length_sq(nodes, b))
        .unwrap_or(Ordering::Equal)
        .then(a.cmp(&b))
}

fn bisect_recursive(
    tet: [usize; 4],
    nodes: &[Node],
    midpoints: &HashMap<(usize, usize), usize>,
    out: &mut Vec<Cell>,
) {
    let longest = TET_EDGES
        .iter()
        .filter_map(|&(i, j)| {
            let key = edge_key(tet[i], tet[j]);
            midpoints.get(&key).map(|&m| (i, j, key, m))
        })
        .max_by(|a, b| compare_edges(nodes, a.2, b.2));

    let Some((i, j, _, m)) = longest else {
        out.push(Cell { vertices: tet });
        return;
    };

    let mut first = tet;
    first[j] = m;
    let mut second = tet;
    second[i] = m;
    bisect_recursive(first, nodes, midpoints, out);
    bisect_recursive(second, nodes, midpoints, out);
}
