use thiserror::Error;

use super::params::{ConfigError, HeatParams, RunConfig};
use crate::discretization::MeshError;
use crate::discretization::generator::create_refined_box_mesh;
use crate::discretization::mesh::Mesh;
use crate::discretization::refine::RefinementBand;
use crate::numerics::solver::SolverError;
use crate::numerics::sparse::ConjugateGradientSolver;
use crate::numerics::transient::{TimeStepper, TransientReport};
use crate::physics::bc::DirichletBC;
use crate::physics::source::MovingGaussianSource;
use crate::physics::space::{FunctionSpace, TemperatureField};
use crate::processing::hardening::{
    AnalysisError, HardeningAnalysis, HardeningMetric, HardeningReport,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Mesh(#[from] MeshError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// Build the refined block mesh for `params`.
pub fn laser_problem_def(params: &HeatParams) -> Result<Mesh, ConfigError> {
    params.validate()?;

    let domain = params.domain();
    let band = RefinementBand::around_beam(params.beam_radius, params.refinement_width);
    let mesh = create_refined_box_mesh(
        domain.corner_a,
        domain.corner_b,
        params.length,
        params.resolution,
        &band,
        params.refinement_passes,
    );

    log::info!(
        "mesh: {} vertices, {} cells, h_min = {:.4e}, h_max = {:.4e}",
        mesh.num_nodes(),
        mesh.num_cells(),
        mesh.h_min(),
        mesh.h_max()
    );
    for (i, pass) in mesh.refinement.iter().enumerate() {
        log::info!(
            "refinement pass {}: {} marked, {} edges bisected, cells {} -> {}",
            i + 1,
            pass.marked_cells,
            pass.bisected_edges,
            pass.cells_before,
            pass.cells_after
        );
    }
    Ok(mesh)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metric {
    Depth,
    Width,
}

impl Metric {
    fn pick(&self, report: &HardeningReport) -> HardeningMetric {
        match self {
            Metric::Depth => report.depth,
            Metric::Width => report.width,
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Depth => write!(f, "hardened depth"),
            Metric::Width => write!(f, "hardened width"),
        }
    }
}

/// Result recorded for one velocity of a sweep.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricOutcome {
    Computed(f64),
    NoQualifyingVertex,
    /// The run aborted before a final field was available.
    SolverFailure(RunError),
}

impl MetricOutcome {
    /// Plotting value: zero for an empty selection, `None` for a failed run.
    pub fn value(&self) -> Option<f64> {
        match self {
            MetricOutcome::Computed(v) => Some(*v),
            MetricOutcome::NoQualifyingVertex => Some(0.0),
            MetricOutcome::SolverFailure(_) => None,
        }
    }
}

impl From<HardeningMetric> for MetricOutcome {
    fn from(m: HardeningMetric) -> Self {
        match m {
            HardeningMetric::Measured(v) => MetricOutcome::Computed(v),
            HardeningMetric::NoQualifyingVertex => MetricOutcome::NoQualifyingVertex,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepPoint {
    pub velocity: f64,
    pub outcome: MetricOutcome,
}

/// One metric as a function of scan velocity, in sweep order.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepCurve {
    pub metric: Metric,
    pub points: Vec<SweepPoint>,
}

impl SweepCurve {
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            points: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// `(velocity, value)` for every successful point.
    pub fn pairs(&self) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .filter_map(|p| p.outcome.value().map(|v| (p.velocity, v)))
            .collect()
    }

    pub fn failures(&self) -> Vec<(f64, &RunError)> {
        self.points
            .iter()
            .filter_map(|p| match &p.outcome {
                MetricOutcome::SolverFailure(e) => Some((p.velocity, e)),
                _ => None,
            })
            .collect()
    }

    /// Consecutive successful points where the hardened extent grows with
    /// velocity. Faster scans deposit less energy per length, so the extent
    /// is expected to shrink.
    pub fn monotonicity_violations(&self) -> Vec<(f64, f64)> {
        self.pairs()
            .windows(2)
            .filter(|w| w[1].1.abs() > w[0].1.abs())
            .map(|w| (w[0].0, w[1].0))
            .collect()
    }
}

/// Final state of one simulated velocity.
pub struct RunOutput {
    pub config: RunConfig,
    pub transient: TransientReport,
    pub hardening: HardeningReport,
}

/// Runs the hardening simulation for a series of scan velocities over one
/// fixed mesh. The function space and boundary condition are set up once;
/// each velocity gets its own [`RunConfig`], source and time stepper.
pub struct LaserSweep<'m> {
    params: HeatParams,
    space: FunctionSpace<'m>,
    bc: DirichletBC,
    analysis: HardeningAnalysis,
    solver: ConjugateGradientSolver,
}

impl<'m> LaserSweep<'m> {
    pub fn new(mesh: &'m Mesh, params: HeatParams) -> Result<Self, RunError> {
        params.validate()?;
        let space = FunctionSpace::new(mesh)?;

        let domain = params.domain();
        let bc = DirichletBC::ambient_open_top_and_outlet(
            params.ambient,
            domain.z_top(),
            domain.x_max(),
            params.boundary_tolerance,
        );
        let analysis = HardeningAnalysis::new(params.threshold);

        Ok(Self {
            params,
            space,
            bc,
            analysis,
            solver: ConjugateGradientSolver::default(),
        })
    }

    /// Linear solver settings used by every time step of every run.
    pub fn with_solver(mut self, solver: ConjugateGradientSolver) -> Self {
        self.solver = solver;
        self
    }

    pub fn params(&self) -> &HeatParams {
        &self.params
    }

    pub fn mesh(&self) -> &'m Mesh {
        self.space.mesh()
    }

    pub fn space(&self) -> &FunctionSpace<'m> {
        &self.space
    }

    pub fn run_config(&self, velocity: f64) -> Result<RunConfig, ConfigError> {
        RunConfig::for_velocity(&self.params, self.mesh(), velocity)
    }

    fn source(&self, config: &RunConfig) -> MovingGaussianSource {
        let p = &self.params;
        MovingGaussianSource::new(
            p.diffusivity,
            p.conductivity,
            p.peak_flux,
            config.velocity,
            p.beam_radius,
            p.penetration_depth,
            config.dt,
        )
    }

    /// Simulate one velocity from the ambient state, reporting every step
    /// to `observer`.
    pub fn simulate_with(
        &self,
        velocity: f64,
        observer: impl FnMut(usize, f64, &TemperatureField),
    ) -> Result<RunOutput, RunError> {
        let config = self.run_config(velocity)?;
        log::info!(
            "v = {:>5.2} mm/s: dt = {:.4e} s, {} steps to t = {:.3} s",
            config.velocity,
            config.dt,
            config.num_steps,
            config.final_time
        );

        let stepper = TimeStepper::new(
            &self.space,
            &self.bc,
            self.source(&config),
            self.params.diffusivity,
            config.dt,
            config.num_steps,
        )
        .with_solver(self.solver.clone())
        .with_initial_condition(&self.space.constant(self.params.ambient));
        let transient = stepper.run(observer)?;
        let hardening = self.analysis.measure(self.mesh(), &transient.field)?;

        log::info!(
            "v = {:>5.2} mm/s: T_max = {:.1} at x = {:.3}, depth = {:.4}, half-width = {:.4} \
             ({} CG iterations)",
            config.velocity,
            hardening.hot_spot.temperature,
            hardening.hot_spot.x,
            hardening.depth.value(),
            hardening.width.value(),
            transient.linear_iterations
        );

        Ok(RunOutput {
            config,
            transient,
            hardening,
        })
    }

    pub fn simulate(&self, velocity: f64) -> Result<RunOutput, RunError> {
        self.simulate_with(velocity, |_, _, _| {})
    }

    /// Single run at the reference scan velocity.
    pub fn reference_run(&self) -> Result<RunOutput, RunError> {
        self.simulate(self.params.reference_velocity)
    }

    /// Run every configured velocity once and record the requested metrics.
    fn sweep(&self, metrics: &[Metric]) -> Vec<SweepCurve> {
        let mut curves: Vec<SweepCurve> = metrics.iter().map(|m| SweepCurve::new(*m)).collect();

        for &velocity in &self.params.velocities {
            match self.simulate(velocity) {
                Ok(run) => {
                    for curve in &mut curves {
                        curve.points.push(SweepPoint {
                            velocity,
                            outcome: curve.metric.pick(&run.hardening).into(),
                        });
                    }
                }
                Err(e) => {
                    log::warn!("v = {velocity:.2} mm/s failed: {e}");
                    for curve in &mut curves {
                        curve.points.push(SweepPoint {
                            velocity,
                            outcome: MetricOutcome::SolverFailure(e.clone()),
                        });
                    }
                }
            }
        }

        for curve in &curves {
            for (a, b) in curve.monotonicity_violations() {
                log::warn!("{} increases between v = {a:.2} and v = {b:.2} mm/s", curve.metric);
            }
        }
        curves
    }

    fn single(&self, metric: Metric) -> SweepCurve {
        self.sweep(&[metric])
            .pop()
            .unwrap_or_else(|| SweepCurve::new(metric))
    }

    pub fn depth_sweep(&self) -> SweepCurve {
        self.single(Metric::Depth)
    }

    pub fn width_sweep(&self) -> SweepCurve {
        self.single(Metric::Width)
    }

    /// Depth and width curves from a single pass over the velocities.
    pub fn sweep_both(&self) -> (SweepCurve, SweepCurve) {
        let mut curves = self.sweep(&[Metric::Depth, Metric::Width]).into_iter();
        let depth = curves.next().unwrap_or_else(|| SweepCurve::new(Metric::Depth));
        let width = curves.next().unwrap_or_else(|| SweepCurve::new(Metric::Width));
        (depth, width)
    }
}
