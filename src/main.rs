use std::time::Instant;

use hardening_fem::models::laser::params::HeatParams;
use hardening_fem::models::laser::sweep::{LaserSweep, laser_problem_def};
use hardening_fem::numerics::timing::{finalize_and_log, reset_timing};
use hardening_fem::processing::summary::SimulationSummary;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let params = HeatParams::default();
    let mesh = match laser_problem_def(&params) {
        Ok(mesh) => mesh,
        Err(e) => {
            log::error!("invalid problem definition: {e}");
            std::process::exit(1);
        }
    };
    let mut summary = SimulationSummary::from_problem(&mesh, &params);

    let sweep = match LaserSweep::new(&mesh, params) {
        Ok(sweep) => sweep,
        Err(e) => {
            log::error!("failed to set up the sweep: {e}");
            std::process::exit(1);
        }
    };

    reset_timing();
    let start = Instant::now();
    let (depth, width) = sweep.sweep_both();
    finalize_and_log(start.elapsed());

    summary.add_curve(depth);
    summary.add_curve(width);

    match sweep.reference_run() {
        Ok(run) => {
            let field = &run.transient.field;
            if let Err(e) = summary.add_reference_field(&mesh, run.config.velocity, field) {
                log::warn!("centreline extraction failed: {e}");
            }
        }
        Err(e) => log::warn!("reference run failed: {e}"),
    }
    summary.log();
}
