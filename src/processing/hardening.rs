use std::collections::BTreeMap;

use thiserror::Error;

use crate::discretization::mesh::Mesh;
use crate::physics::space::TemperatureField;

/// Austenitisation temperature of the steel, in degrees Celsius.
pub const HARDENING_THRESHOLD: f64 = 727.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("temperature field is empty")]
    EmptyField,
    #[error("field has {field} values but the mesh has {nodes} vertices")]
    LengthMismatch { field: usize, nodes: usize },
}

/// Result of a depth or width measurement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HardeningMetric {
    Measured(f64),
    /// No vertex of the slice exceeds the threshold.
    NoQualifyingVertex,
}

impl HardeningMetric {
    /// Numeric reading; an empty selection reads as zero.
    pub fn value(&self) -> f64 {
        match self {
            HardeningMetric::Measured(v) => *v,
            HardeningMetric::NoQualifyingVertex => 0.0,
        }
    }
}

/// The hottest vertex of a field and the column it sits in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HotSpot {
    pub vertex: usize,
    pub column: i64,
    pub x: f64,
    pub temperature: f64,
}

/// One vertex of a transverse (constant-x) slice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlicePoint {
    pub vertex: usize,
    pub y: f64,
    pub z: f64,
    pub temperature: f64,
}

/// One vertex of the longitudinal centreline plane `y = 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProfilePoint {
    pub vertex: usize,
    pub x: f64,
    pub z: f64,
    pub temperature: f64,
}

/// Position of the peak temperature at one depth of the centreline plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackPoint {
    pub z: f64,
    pub x: f64,
    pub temperature: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HardeningReport {
    pub hot_spot: HotSpot,
    pub depth: HardeningMetric,
    pub width: HardeningMetric,
}

/// Extracts hardened depth and width from a final temperature field.
///
/// Both metrics are read on the transverse slice through the hottest vertex.
/// The depth is the lowest `z` and the width the largest `y` among slice
/// vertices hotter than `threshold`. The width is a half-width; the hardened
/// track is twice as wide.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HardeningAnalysis {
    pub threshold: f64,
}

impl Default for HardeningAnalysis {
    fn default() -> Self {
        Self {
            threshold: HARDENING_THRESHOLD,
        }
    }
}

impl HardeningAnalysis {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    fn check(mesh: &Mesh, field: &TemperatureField) -> Result<(), AnalysisError> {
        if field.is_empty() {
            return Err(AnalysisError::EmptyField);
        }
        if field.len() != mesh.num_nodes() {
            return Err(AnalysisError::LengthMismatch {
                field: field.len(),
                nodes: mesh.num_nodes(),
            });
        }
        Ok(())
    }

    pub fn hot_spot(
        &self,
        mesh: &Mesh,
        field: &TemperatureField,
    ) -> Result<HotSpot, AnalysisError> {
        Self::check(mesh, field)?;
        let (vertex, temperature) = field.argmax().ok_or(AnalysisError::EmptyField)?;
        Ok(HotSpot {
            vertex,
            column: mesh.column(vertex),
            x: mesh.nodes[vertex].position[0],
            temperature,
        })
    }

    /// Every vertex in `column`, in vertex order.
    pub fn slice(&self, mesh: &Mesh, field: &TemperatureField, column: i64) -> Vec<SlicePoint> {
        mesh.nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| mesh.column(*i) == column)
            .map(|(i, node)| SlicePoint {
                vertex: i,
                y: node.position[1],
                z: node.position[2],
                temperature: field.values()[i],
            })
            .collect()
    }

    /// The transverse slice through the hottest vertex.
    pub fn hot_slice(
        &self,
        mesh: &Mesh,
        field: &TemperatureField,
    ) -> Result<Vec<SlicePoint>, AnalysisError> {
        let spot = self.hot_spot(mesh, field)?;
        Ok(self.slice(mesh, field, spot.column))
    }

    fn above_threshold<'s>(&self, slice: &'s [SlicePoint]) -> impl Iterator<Item = &'s SlicePoint> {
        let threshold = self.threshold;
        slice.iter().filter(move |p| p.temperature > threshold)
    }

    pub fn depth_of(&self, slice: &[SlicePoint]) -> HardeningMetric {
        self.above_threshold(slice)
            .map(|p| p.z)
            .reduce(f64::min)
            .map_or(HardeningMetric::NoQualifyingVertex, HardeningMetric::Measured)
    }

    pub fn width_of(&self, slice: &[SlicePoint]) -> HardeningMetric {
        self.above_threshold(slice)
            .map(|p| p.y)
            .reduce(f64::max)
            .map_or(HardeningMetric::NoQualifyingVertex, HardeningMetric::Measured)
    }

    /// Depth and width from a single slice extraction.
    pub fn measure(
        &self,
        mesh: &Mesh,
        field: &TemperatureField,
    ) -> Result<HardeningReport, AnalysisError> {
        let hot_spot = self.hot_spot(mesh, field)?;
        let slice = self.slice(mesh, field, hot_spot.column);
        Ok(HardeningReport {
            hot_spot,
            depth: self.depth_of(&slice),
            width: self.width_of(&slice),
        })
    }
}

/// Vertices on the plane `y = 0`, ordered by depth then by x.
///
/// Empty when the mesh has no vertex plane at `y = 0`.
pub fn centreline_profile(
    mesh: &Mesh,
    field: &TemperatureField,
) -> Result<Vec<ProfilePoint>, AnalysisError> {
    HardeningAnalysis::check(mesh, field)?;
    let Some(plane) = mesh.lattice_coordinate(1, 0.0, 1e-9) else {
        return Ok(Vec::new());
    };

    let mut profile: Vec<ProfilePoint> = mesh
        .nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.lattice[1] == plane)
        .map(|(i, n)| ProfilePoint {
            vertex: i,
            x: n.position[0],
            z: n.position[2],
            temperature: field.values()[i],
        })
        .collect();
    profile.sort_by(|a, b| b.z.total_cmp(&a.z).then(a.x.total_cmp(&b.x)));
    Ok(profile)
}

/// For every depth of the centreline plane, where along x the field peaks.
/// Ordered from the surface downwards.
pub fn melt_pool_track(
    mesh: &Mesh,
    field: &TemperatureField,
) -> Result<Vec<TrackPoint>, AnalysisError> {
    let profile = centreline_profile(mesh, field)?;

    let mut peaks: BTreeMap<i64, TrackPoint> = BTreeMap::new();
    for p in &profile {
        let level = mesh.nodes[p.vertex].lattice[2];
        let candidate = TrackPoint {
            z: p.z,
            x: p.x,
            temperature: p.temperature,
        };
        peaks
            .entry(level)
            .and_modify(|best| {
                if candidate.temperature > best.temperature {
                    *best = candidate;
                }
            })
            .or_insert(candidate);
    }

    Ok(peaks.into_values().rev().collect())
}
