use super::mesh::{Bounds, Cell, LATTICE_SCALE, Mesh, Node};
use super::refine::{RefinementBand, mark_cells, refine_marked};

/// Six tetrahedra sharing the main diagonal of a hexahedron. Each entry lists
/// local corner ids with bit 0 = +x, bit 1 = +y, bit 2 = +z.
const KUHN_TETS: [[usize; 4]; 6] = [
    [0, 1, 3, 7],
    [0, 1, 5, 7],
    [0, 2, 3, 7],
    [0, 2, 6, 7],
    [0, 4, 5, 7],
    [0, 4, 6, 7],
];

/// Number of cells along one axis for a given physical extent.
pub fn cells_along(extent: f64, length: f64, resolution: usize) -> usize {
    ((resolution as f64 * extent / length).round() as usize).max(1)
}

/// Build a structured tetrahedral mesh of the box spanned by two corners.
///
/// The corners may be given in any order along each axis. Every hexahedral
/// grid cell is split into six tetrahedra around its main diagonal, which is
/// conforming across neighbouring hexahedra.
pub fn box_mesh(corner_a: [f64; 3], corner_b: [f64; 3], counts: [usize; 3]) -> Mesh {
    let min = [0, 1, 2].map(|i| corner_a[i].min(corner_b[i]));
    let max = [0, 1, 2].map(|i| corner_a[i].max(corner_b[i]));
    let counts = counts.map(|c| c.max(1));
    let spacing = [0, 1, 2].map(|i| (max[i] - min[i]) / counts[i] as f64);

    let [nx, ny, nz] = counts;
    let node_id = |i: usize, j: usize, k: usize| (k * (ny + 1) + j) * (nx + 1) + i;

    let mut nodes = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                let index = [i, j, k];
                // Pin the far planes to the exact corner value.
                let position = [0, 1, 2].map(|a| {
                    if index[a] == counts[a] {
                        max[a]
                    } else {
                        min[a] + index[a] as f64 * spacing[a]
                    }
                });
                nodes.push(Node {
                    position,
                    lattice: index.map(|v| v as i64 * LATTICE_SCALE),
                });
            }
        }
    }

    let mut cells = Vec::with_capacity(6 * nx * ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let corner = |local: usize| {
                    node_id(i + (local & 1), j + ((local >> 1) & 1), k + ((local >> 2) & 1))
                };
                for tet in KUHN_TETS {
                    cells.push(Cell {
                        vertices: tet.map(corner),
                    });
                }
            }
        }
    }

    Mesh {
        nodes,
        cells,
        bounds: Bounds { min, max },
        base_spacing: spacing,
        refinement: Vec::new(),
    }
}

/// Build the box mesh with `resolution * extent / length` cells per axis and
/// then apply `passes` rounds of local refinement inside `band`.
pub fn create_refined_box_mesh(
    corner_a: [f64; 3],
    corner_b: [f64; 3],
    length: f64,
    resolution: usize,
    band: &RefinementBand,
    passes: usize,
) -> Mesh {
    let counts =
        [0, 1, 2].map(|i| cells_along((corner_b[i] - corner_a[i]).abs(), length, resolution));
    let mut mesh = box_mesh(corner_a, corner_b, counts);

    for _ in 0..passes {
        let markers = mark_cells(&mesh, |c| band.contains(c));
        mesh = refine_marked(&mesh, &markers);
    }

    mesh
}
