use crate::numerics::solver::SolverError;
use crate::numerics::sparse::ConjugateGradientSolver;
use crate::numerics::timing::record_assembly;
use crate::physics::VolumetricSource;
use crate::physics::bc::DirichletBC;
use crate::physics::space::{FunctionSpace, TemperatureField};
use crate::physics::weak_form::BackwardEulerSystem;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepperState {
    Initialized,
    Stepping,
    Completed,
}

/// What a finished run hands back.
pub struct TransientReport {
    pub field: TemperatureField,
    pub steps: usize,
    pub final_time: f64,
    pub linear_iterations: u64,
}

/// Fixed-step backward-Euler integration of the heat equation.
///
/// The stepper owns two field slots: `previous` holds the last accepted state
/// and `candidate` receives each linear solve. After a successful solve the
/// candidate is copied into `previous`.
pub struct TimeStepper<'a, S: VolumetricSource> {
    space: &'a FunctionSpace<'a>,
    system: BackwardEulerSystem,
    bc: DirichletBC,
    source: S,
    solver: ConjugateGradientSolver,
    dt: f64,
    num_steps: usize,
    step: usize,
    t: f64,
    linear_iterations: u64,
    state: StepperState,
    previous: TemperatureField,
    candidate: TemperatureField,
}

impl<'a, S: VolumetricSource> TimeStepper<'a, S> {
    /// Assemble the system for `dt` and start from the boundary value everywhere.
    pub fn new(
        space: &'a FunctionSpace<'a>,
        bc: &DirichletBC,
        source: S,
        diffusivity: f64,
        dt: f64,
        num_steps: usize,
    ) -> Self {
        let system = record_assembly(|| BackwardEulerSystem::new(space, bc, diffusivity, dt));
        log::debug!(
            "assembled {} dofs ({} constrained), nnz = {}",
            space.dim(),
            system.num_constrained(),
            system.matrix.nnz()
        );

        Self {
            space,
            system,
            bc: bc.clone(),
            source,
            solver: ConjugateGradientSolver::default(),
            dt,
            num_steps,
            step: 0,
            t: 0.0,
            linear_iterations: 0,
            state: StepperState::Initialized,
            previous: space.constant(bc.value),
            candidate: space.constant(bc.value),
        }
    }

    pub fn with_solver(mut self, solver: ConjugateGradientSolver) -> Self {
        self.solver = solver;
        self
    }

    /// Replace the initial state. Only meaningful before the first step.
    pub fn with_initial_condition(mut self, field: &TemperatureField) -> Self {
        self.previous.assign(field);
        self
    }

    pub fn state(&self) -> StepperState {
        self.state
    }

    pub fn time(&self) -> f64 {
        self.t
    }

    pub fn steps_taken(&self) -> usize {
        self.step
    }

    pub fn num_steps(&self) -> usize {
        self.num_steps
    }

    pub fn previous(&self) -> &TemperatureField {
        &self.previous
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Advance one step. Returns `Ok(false)` once all steps have been taken.
    pub fn step(&mut self) -> Result<bool, SolverError> {
        if self.step >= self.num_steps {
            self.state = StepperState::Completed;
            return Ok(false);
        }
        self.state = StepperState::Stepping;

        let t = self.t + self.dt;
        self.source.set_time(t);
        let q = self.source.interpolate(self.space);
        let b = self.system.rhs(&self.previous, &q);

        let result = self
            .solver
            .solve(&self.system.matrix, &b, self.previous.values().clone())?;

        self.candidate.values_mut().copy_from(&result.solution);
        self.bc.apply(self.system.constrained(), &mut self.candidate);
        self.previous.assign(&self.candidate);

        self.t = t;
        self.step += 1;
        self.linear_iterations += u64::from(result.iterations);
        log::debug!(
            "step {:>4}/{} | t = {:.4e} | cg iters = {} | T_max = {:.1}",
            self.step,
            self.num_steps,
            self.t,
            result.iterations,
            self.previous.max()
        );

        if self.step == self.num_steps {
            self.state = StepperState::Completed;
        }
        Ok(true)
    }

    /// Take every remaining step, calling `observer(step, t, field)` after each.
    pub fn run(
        mut self,
        mut observer: impl FnMut(usize, f64, &TemperatureField),
    ) -> Result<TransientReport, SolverError> {
        log::debug!(
            "starting transient run: {} steps of dt = {:.4e}",
            self.num_steps,
            self.dt
        );
        while self.step()? {
            observer(self.step, self.t, &self.previous);
        }
        self.state = StepperState::Completed;

        Ok(TransientReport {
            field: self.previous,
            steps: self.step,
            final_time: self.t,
            linear_iterations: self.linear_iterations,
        })
    }
}
