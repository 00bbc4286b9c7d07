pub mod generator;
pub mod mesh;
pub mod refine;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeshError {
    #[error("cell {cell} is degenerate (volume {volume:.3e})")]
    DegenerateCell { cell: usize, volume: f64 },
    #[error("mesh has no cells")]
    Empty,
}
