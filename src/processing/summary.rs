use crate::discretization::mesh::{Mesh, RefinementPass};
use crate::models::laser::params::HeatParams;
use crate::models::laser::sweep::SweepCurve;
use crate::physics::space::TemperatureField;
use crate::processing::hardening::{
    AnalysisError, ProfilePoint, TrackPoint, centreline_profile, melt_pool_track,
};

/// Centreline view of one final field.
pub struct ReferenceProfile {
    pub velocity: f64,
    pub centreline: Vec<ProfilePoint>,
    pub track: Vec<TrackPoint>,
}

pub struct SimulationSummary {
    // Mesh info
    pub num_cells: usize,
    pub num_nodes: usize,
    pub domain_min: [f64; 3],
    pub domain_max: [f64; 3],
    pub h_min: f64,
    pub h_max: f64,
    pub avg_cell_volume: f64,
    pub refinement: Vec<RefinementPass>,

    // Physics info
    pub diffusivity: f64,
    pub beam_radius: f64,
    pub ambient: f64,
    pub threshold: f64,

    // Sweep results
    pub curves: Vec<SweepCurve>,
    pub reference: Option<ReferenceProfile>,
}

impl SimulationSummary {
    pub fn from_problem(mesh: &Mesh, params: &HeatParams) -> Self {
        let num_cells = mesh.num_cells();
        let total_volume: f64 = (0..num_cells).map(|c| mesh.cell_volume(c)).sum();

        Self {
            num_cells,
            num_nodes: mesh.num_nodes(),
            domain_min: mesh.bounds.min,
            domain_max: mesh.bounds.max,
            h_min: mesh.h_min(),
            h_max: mesh.h_max(),
            avg_cell_volume: total_volume / num_cells.max(1) as f64,
            refinement: mesh.refinement.clone(),
            diffusivity: params.diffusivity,
            beam_radius: params.beam_radius,
            ambient: params.ambient,
            threshold: params.threshold,
            curves: Vec::new(),
            reference: None,
        }
    }

    pub fn add_curve(&mut self, curve: SweepCurve) {
        self.curves.push(curve);
    }

    pub fn add_reference_field(
        &mut self,
        mesh: &Mesh,
        velocity: f64,
        field: &TemperatureField,
    ) -> Result<(), AnalysisError> {
        self.reference = Some(ReferenceProfile {
            velocity,
            centreline: centreline_profile(mesh, field)?,
            track: melt_pool_track(mesh, field)?,
        });
        Ok(())
    }

    fn log_reference(&self, reference: &ReferenceProfile) {
        log::info!("{}", "-".repeat(60));
        log::info!("Centreline y = 0 at v = {:.2} mm/s", reference.velocity);

        let hot: Vec<&ProfilePoint> = reference
            .centreline
            .iter()
            .filter(|p| p.temperature > self.threshold)
            .collect();
        log::info!(
            "  {} vertices, {} above {} degC",
            reference.centreline.len(),
            hot.len(),
            self.threshold
        );
        let x_min = hot.iter().map(|p| p.x).reduce(f64::min);
        let x_max = hot.iter().map(|p| p.x).reduce(f64::max);
        if let (Some(a), Some(b)) = (x_min, x_max) {
            log::info!("  hardened along x in [{a:.3}, {b:.3}] mm");
        }

        // Surface first; stop at the first level that stays below threshold.
        log::info!("  melt-pool track ({} depth levels):", reference.track.len());
        for p in reference
            .track
            .iter()
            .take_while(|p| p.temperature > self.threshold)
        {
            log::info!("    z = {:>8.4}  x = {:>8.4}  T = {:>7.1}", p.z, p.x, p.temperature);
        }
    }

    /// Write the summary through the `log` facade at info level.
    pub fn log(&self) {
        log::info!("{}", "=".repeat(60));
        log::info!("LASER HARDENING SIMULATION SUMMARY");
        log::info!("{}", "=".repeat(60));
        log::info!("Mesh:          {} cells, {} nodes", self.num_cells, self.num_nodes);
        log::info!(
            "Domain:        [{:.2}, {:.2}] x [{:.2}, {:.2}] x [{:.2}, {:.2}] mm",
            self.domain_min[0],
            self.domain_max[0],
            self.domain_min[1],
            self.domain_max[1],
            self.domain_min[2],
            self.domain_max[2]
        );
        log::info!("Edge length:   {:.4e} .. {:.4e} mm", self.h_min, self.h_max);
        log::info!("Avg cell vol:  {:.4e} mm^3", self.avg_cell_volume);
        for (i, pass) in self.refinement.iter().enumerate() {
            log::info!(
                "Refinement {}:  {} marked, {} -> {} cells",
                i + 1,
                pass.marked_cells,
                pass.cells_before,
                pass.cells_after
            );
        }
        log::info!(
            "Physics:       alpha = {} mm^2/s, r_b = {} mm, T0 = {}, threshold = {}",
            self.diffusivity,
            self.beam_radius,
            self.ambient,
            self.threshold
        );

        for curve in &self.curves {
            log::info!("{}", "-".repeat(60));
            log::info!("{} vs velocity", curve.metric);
            for (v, value) in curve.pairs() {
                log::info!("  v = {v:>5.2} mm/s  {value:>9.4} mm");
            }
            for (v, e) in curve.failures() {
                log::info!("  v = {v:>5.2} mm/s  failed: {e}");
            }
            let violations = curve.monotonicity_violations();
            if !violations.is_empty() {
                log::info!("  non-monotone between {:?}", violations);
            }
        }
        if let Some(reference) = &self.reference {
            self.log_reference(reference);
        }
        log::info!("{}", "=".repeat(60));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::generator::box_mesh;
    use crate::models::laser::sweep::{Metric, MetricOutcome, SweepPoint};
    use crate::physics::space::FunctionSpace;

    #[test]
    fn summary_collects_mesh_statistics() {
        let mesh = box_mesh([0.0, 0.0, 0.0], [2.0, 1.0, 1.0], [2, 1, 1]);
        let mut summary = SimulationSummary::from_problem(&mesh, &HeatParams::default());
        assert_eq!(summary.num_cells, 12);
        assert_eq!(summary.num_nodes, 12);
        assert!((summary.avg_cell_volume - 2.0 / 12.0).abs() < 1e-12);
        assert!(summary.refinement.is_empty());

        summary.add_curve(SweepCurve {
            metric: Metric::Width,
            points: vec![SweepPoint {
                velocity: 1.0,
                outcome: MetricOutcome::Computed(1.5),
            }],
        });
        assert_eq!(summary.curves.len(), 1);
        summary.log();
    }

    #[test]
    fn reference_field_feeds_centreline_and_track() {
        let mesh = box_mesh([-2.0, -2.0, -2.0], [6.0, 2.0, 0.0], [8, 4, 4]);
        let space = FunctionSpace::new(&mesh).unwrap();
        let field = space.interpolate(|[x, y, z]| 1000.0 - (x - 4.0 - 2.0 * z).powi(2) - y * y);

        let mut summary = SimulationSummary::from_problem(&mesh, &HeatParams::default());
        summary.add_reference_field(&mesh, 8.0, &field).unwrap();

        let reference = summary.reference.as_ref().unwrap();
        assert_eq!(reference.velocity, 8.0);
        assert_eq!(reference.centreline.len(), 9 * 5);
        assert_eq!(reference.track.len(), 5);
        assert_eq!(reference.track[0].x, 4.0);
        summary.log();

        let short = TemperatureField::from_vector(nalgebra::DVector::zeros(2));
        assert!(summary.add_reference_field(&mesh, 8.0, &short).is_err());
    }
}
