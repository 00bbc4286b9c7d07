use glam::DVec3;
use std::collections::HashMap;

/// Scale applied to base-grid indices so that every edge midpoint created by
/// refinement still lands on an integer lattice coordinate.
pub const LATTICE_SCALE: i64 = 1 << 20;

/// The complete computational grid: tetrahedra over an axis-aligned box.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub nodes: Vec<Node>,
    pub cells: Vec<Cell>,
    pub bounds: Bounds,
    /// Physical length of one base-grid step along each axis.
    pub base_spacing: [f64; 3],
    /// One entry per refinement pass applied to this mesh.
    pub refinement: Vec<RefinementPass>,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub position: [f64; 3],
    /// Exact integer coordinate: base index times [`LATTICE_SCALE`], averaged on bisection.
    pub lattice: [i64; 3],
}

/// A tetrahedron given by four node indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub vertices: [usize; 4],
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Bounds {
    pub fn extent(&self, axis: usize) -> f64 {
        (self.max[axis] - self.min[axis]).abs()
    }
}

/// Bookkeeping for one local refinement pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefinementPass {
    pub marked_cells: usize,
    pub bisected_edges: usize,
    pub cells_before: usize,
    pub cells_after: usize,
}

/// A triangular boundary facet and the cell it belongs to.
#[derive(Clone, Copy, Debug)]
pub struct BoundaryFacet {
    pub vertices: [usize; 3],
    pub cell: usize,
}

/// Local vertex pairs forming the six edges of a tetrahedron.
pub const TET_EDGES: [(usize, usize); 6] = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];

/// Local vertex triples forming the four faces of a tetrahedron.
pub const TET_FACES: [[usize; 3]; 4] = [[1, 2, 3], [0, 2, 3], [0, 1, 3], [0, 1, 2]];

impl Mesh {
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn point(&self, node: usize) -> DVec3 {
        DVec3::from_array(self.nodes[node].position)
    }

    #[inline]
    pub fn cell_points(&self, cell: usize) -> [DVec3; 4] {
        self.cells[cell].vertices.map(|v| self.point(v))
    }

    pub fn cell_centroid(&self, cell: usize) -> DVec3 {
        let [a, b, c, d] = self.cell_points(cell);
        (a + b + c + d) * 0.25
    }

    /// Unsigned cell volume.
    pub fn cell_volume(&self, cell: usize) -> f64 {
        let [a, b, c, d] = self.cell_points(cell);
        (b - a).dot((c - a).cross(d - a)).abs() / 6.0
    }

    /// Minimum distance between two vertices joined by an edge.
    pub fn h_min(&self) -> f64 {
        self.edge_lengths().fold(f64::INFINITY, f64::min)
    }

    /// Maximum edge length.
    pub fn h_max(&self) -> f64 {
        self.edge_lengths().fold(0.0, f64::max)
    }

    fn edge_lengths(&self) -> impl Iterator<Item = f64> + '_ {
        self.cells.iter().flat_map(move |cell| {
            TET_EDGES.iter().map(move |&(i, j)| {
                self.point(cell.vertices[i])
                    .distance(self.point(cell.vertices[j]))
            })
        })
    }

    /// Column index of a node: vertices sharing an x-plane share a column.
    #[inline]
    pub fn column(&self, node: usize) -> i64 {
        self.nodes[node].lattice[0]
    }

    /// Map a physical coordinate onto the lattice, if it falls exactly on a
    /// lattice plane (within `tol` of the base spacing).
    pub fn lattice_coordinate(&self, axis: usize, value: f64, tol: f64) -> Option<i64> {
        let steps = (value - self.bounds.min[axis]) / self.base_spacing[axis];
        let scaled = steps * LATTICE_SCALE as f64;
        let rounded = scaled.round();
        if (scaled - rounded).abs() <= tol * LATTICE_SCALE as f64 {
            Some(rounded as i64)
        } else {
            None
        }
    }

    /// Faces that belong to exactly one tetrahedron.
    pub fn boundary_facets(&self) -> Vec<BoundaryFacet> {
        let mut seen: HashMap<[usize; 3], (usize, usize, [usize; 3])> = HashMap::new();
        for (cell_idx, cell) in self.cells.iter().enumerate() {
            for face in TET_FACES {
                let tri = face.map(|i| cell.vertices[i]);
                let mut key = tri;
                key.sort_unstable();
                seen.entry(key)
                    .and_modify(|entry| entry.0 += 1)
                    .or_insert((1, cell_idx, tri));
            }
        }

        let mut facets: Vec<BoundaryFacet> = seen
            .into_values()
            .filter(|(count, _, _)| *count == 1)
            .map(|(_, cell, vertices)| BoundaryFacet { vertices, cell })
            .collect();
        facets.sort_unstable_by_key(|f| (f.cell, f.vertices));
        facets
    }

    /// Centroid of a boundary facet together with its outward unit normal.
    pub fn facet_geometry(&self, facet: &BoundaryFacet) -> (DVec3, DVec3) {
        let [a, b, c] = facet.vertices.map(|v| self.point(v));
        let centroid = (a + b + c) / 3.0;
        let mut normal = (b - a).cross(c - a).normalize_or_zero();
        if normal.dot(centroid - self.cell_centroid(facet.cell)) < 0.0 {
            normal = -normal;
        }
        (centroid, normal)
    }
}
