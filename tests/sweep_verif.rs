use hardening_fem::models::laser::params::{HeatParams, RunConfig};
use hardening_fem::models::laser::sweep::{
    LaserSweep, MetricOutcome, RunError, SweepCurve, laser_problem_def,
};
use hardening_fem::numerics::solver::SolverError;
use hardening_fem::numerics::sparse::ConjugateGradientSolver;
use hardening_fem::physics::space::FunctionSpace;
use hardening_fem::processing::hardening::{HardeningAnalysis, HardeningMetric};

fn small_params() -> HeatParams {
    HeatParams::default()
        .with_length(10.0)
        .with_resolution(4)
        .with_refinement(1.0, 1)
}

#[test]
fn run_config_uses_mesh_spacing() {
    let params = HeatParams::default();
    let mesh = laser_problem_def(&params).unwrap();
    let h_min = mesh.h_min();
    println!("h_min = {h_min:.4e}, {} vertices", mesh.num_nodes());

    for &v in &params.velocities {
        let cfg = RunConfig::for_velocity(&params, &mesh, v).unwrap();
        assert_eq!(cfg.dt, h_min / v);
        assert_eq!(cfg.final_time, 50.0 / v / 2.0);
        assert_eq!(cfg.num_steps, (cfg.final_time / cfg.dt).floor() as usize);
        assert!(cfg.num_steps > 0);
    }
}

#[test]
fn hot_slice_sits_on_the_unique_maximum() {
    let params = small_params();
    let mesh = laser_problem_def(&params).unwrap();
    let space = FunctionSpace::new(&mesh).unwrap();
    let field = space.interpolate(|[x, y, z]| 1000.0 - (x - 5.0).powi(2) - y * y - z * z);

    let analysis = HardeningAnalysis::default();
    let spot = analysis.hot_spot(&mesh, &field).unwrap();
    assert_eq!(mesh.nodes[spot.vertex].position, [5.0, 0.0, 0.0]);
    assert_eq!(spot.x, 5.0);

    let slice = analysis.hot_slice(&mesh, &field).unwrap();
    assert!(slice.iter().all(|p| mesh.nodes[p.vertex].position[0] == 5.0));
    // The lattice column holds every vertex on the plane, refined ones included.
    let on_plane = mesh.nodes.iter().filter(|n| n.position[0] == 5.0).count();
    assert_eq!(slice.len(), on_plane);
}

#[test]
fn unreachable_threshold_yields_no_qualifying_vertex() {
    let params = small_params().with_threshold(1e12).with_velocities(vec![16.0]);
    let mesh = laser_problem_def(&params).unwrap();
    let sweep = LaserSweep::new(&mesh, params).unwrap();

    let (depth, width) = sweep.sweep_both();
    assert_eq!(depth.points.len(), 1);
    assert_eq!(depth.points[0].outcome, MetricOutcome::NoQualifyingVertex);
    assert_eq!(width.points[0].outcome, MetricOutcome::NoQualifyingVertex);
    assert_eq!(depth.pairs(), vec![(16.0, 0.0)]);
}

#[test]
fn zero_flux_run_stays_at_ambient() {
    let params = small_params().with_peak_flux(0.0).with_velocities(vec![8.0]);
    let ambient = params.ambient;
    let mesh = laser_problem_def(&params).unwrap();
    let sweep = LaserSweep::new(&mesh, params).unwrap();

    let run = sweep.simulate(8.0).expect("Solved");
    let max_dev = run
        .transient
        .field
        .values()
        .iter()
        .map(|t| (t - ambient).abs())
        .fold(0.0, f64::max);
    println!("Max deviation from ambient after {} steps: {max_dev:.2e}", run.transient.steps);
    assert!(max_dev < 1e-8);
    assert_eq!(run.hardening.depth, HardeningMetric::NoQualifyingVertex);
    assert_eq!(run.hardening.width, HardeningMetric::NoQualifyingVertex);
}

fn is_linear_solve_failure(outcome: &MetricOutcome) -> bool {
    matches!(
        outcome,
        MetricOutcome::SolverFailure(RunError::Solver(SolverError::LinearSolveFailed(_)))
    )
}

fn assert_all_failed(curve: &SweepCurve) {
    assert!(curve.pairs().is_empty());
    assert_eq!(curve.failures().len(), curve.len());
}

#[test]
fn overflowing_source_is_a_solver_failure_not_an_empty_selection() {
    let params = small_params()
        .with_peak_flux(1e308)
        .with_velocities(vec![4.0, 8.0]);
    let mesh = laser_problem_def(&params).unwrap();
    let sweep = LaserSweep::new(&mesh, params).unwrap();

    let depth = sweep.depth_sweep();
    let velocities: Vec<f64> = depth.points.iter().map(|p| p.velocity).collect();
    assert_eq!(velocities, vec![4.0, 8.0]);
    for point in &depth.points {
        assert!(is_linear_solve_failure(&point.outcome), "{:?}", point.outcome);
    }
    assert_all_failed(&depth);
}

#[test]
fn sweep_continues_past_a_failed_velocity() {
    // A crawling scan stretches dt until the right-hand side overflows.
    let params = small_params().with_velocities(vec![1e-200, 8.0]);
    let mesh = laser_problem_def(&params).unwrap();
    let sweep = LaserSweep::new(&mesh, params).unwrap();

    let (depth, width) = sweep.sweep_both();
    for curve in [&depth, &width] {
        assert_eq!(curve.len(), 2);
        assert!(is_linear_solve_failure(&curve.points[0].outcome));
        assert!(!matches!(curve.points[1].outcome, MetricOutcome::SolverFailure(_)));
        assert_eq!(curve.failures().len(), 1);
        assert_eq!(curve.failures()[0].0, 1e-200);
        assert_eq!(curve.pairs().len(), 1);
        assert_eq!(curve.pairs()[0].0, 8.0);
    }
}

#[test]
fn capped_solver_records_non_convergence_for_every_velocity() {
    let params = small_params().with_velocities(vec![4.0, 16.0]);
    let mesh = laser_problem_def(&params).unwrap();
    let sweep = LaserSweep::new(&mesh, params)
        .unwrap()
        .with_solver(ConjugateGradientSolver {
            max_iterations: 1,
            ..Default::default()
        });

    let width = sweep.width_sweep();
    assert_eq!(width.len(), 2);
    for point in &width.points {
        assert!(matches!(
            point.outcome,
            MetricOutcome::SolverFailure(RunError::Solver(SolverError::NonConvergence {
                iterations: 1,
                ..
            }))
        ));
        assert_eq!(point.outcome.value(), None);
    }
    assert_all_failed(&width);
}

#[test]
fn reference_run_uses_the_reference_velocity() {
    let params = small_params();
    let reference = params.reference_velocity;
    let mesh = laser_problem_def(&params).unwrap();
    let sweep = LaserSweep::new(&mesh, params).unwrap();

    let run = sweep.reference_run().expect("Solved");
    assert_eq!(run.config.velocity, reference);
    assert_eq!(run.config.dt, mesh.h_min() / reference);
    assert_eq!(run.transient.steps, run.config.num_steps);
}

#[test]
fn small_sweep_reports_both_curves() {
    let params = small_params().with_velocities(vec![4.0, 8.0, 16.0]);
    let mesh = laser_problem_def(&params).unwrap();
    let sweep = LaserSweep::new(&mesh, params).unwrap();

    let depth = sweep.depth_sweep();
    let width = sweep.width_sweep();
    let velocities: Vec<f64> = depth.points.iter().map(|p| p.velocity).collect();
    assert_eq!(velocities, vec![4.0, 8.0, 16.0]);
    assert_eq!(width.len(), 3);
    assert!(depth.failures().is_empty());
    assert!(width.failures().is_empty());
    for (v, d) in depth.pairs() {
        assert!(d <= 0.0, "depth {d} at v = {v}");
    }
    println!("Depth violations: {:?}", depth.monotonicity_violations());
    println!("Width violations: {:?}", width.monotonicity_violations());
}

#[test]
fn reference_case_at_eight_mm_per_second() {
    let params = HeatParams::default();
    let mesh = laser_problem_def(&params).unwrap();
    let sweep = LaserSweep::new(&mesh, params).unwrap();

    let mut steps = 0;
    let run = sweep
        .simulate_with(8.0, |step, _, _| steps = step)
        .expect("v = 8 completes without solver failure");

    println!(
        "{} steps, T_max = {:.1}, depth = {:?}, half-width = {:?}",
        run.transient.steps,
        run.hardening.hot_spot.temperature,
        run.hardening.depth,
        run.hardening.width
    );
    assert_eq!(steps, run.config.num_steps);
    assert_eq!(run.transient.steps, run.config.num_steps);
    assert!(run.hardening.width.value() >= 0.0);
    if let HardeningMetric::Measured(d) = run.hardening.depth {
        assert!(d <= 0.0);
    }
}

#[test]
#[ignore = "full 16-velocity sweep on the reference mesh"]
fn full_velocity_sweep() {
    let params = HeatParams::default();
    let mesh = laser_problem_def(&params).unwrap();
    let sweep = LaserSweep::new(&mesh, params).unwrap();

    let (depth, width) = sweep.sweep_both();
    assert_eq!(depth.len(), 16);
    assert_eq!(width.len(), 16);

    for ((v, d), (_, w)) in depth.pairs().iter().zip(width.pairs().iter()) {
        println!("v = {v:>5.2}  depth = {:>8.4}  width = {:>8.4}", -d, 2.0 * w);
    }
    // Reported, not asserted: the curve is not guaranteed to be monotone on a
    // fixed mesh.
    println!("Depth violations: {:?}", depth.monotonicity_violations());
    println!("Width violations: {:?}", width.monotonicity_violations());
}
