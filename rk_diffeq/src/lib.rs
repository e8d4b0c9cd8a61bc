//! Runge-Kutta time stepping: Butcher tableaux, explicit, diagonally implicit and Lawson
//! stepping with an embedded error estimate, a time-loop driver and an ensemble runner.
//!
//! ```no_run
//! use rk_diffeq::{Algorithm, ButcherTableau, MemoryResult, Method, OdeProblem};
//!
//! let algorithm = Algorithm::explicit(ButcherTableau::<4>::BOGACKI_SHAMPINE).with_tolerance(1e-6);
//! let mut method = Method::new(algorithm, &1.0).unwrap();
//! let mut problem = OdeProblem::new(|_t: f64, y: &f64| -y);
//! let mut result = MemoryResult::new(64);
//! let solution = problem.solve(&mut method, &1.0, (0.0, 1.0), 1e-2, &mut result).unwrap();
//! println!("y(1) = {}", solution.y);
//! ```

/// Submodules for core ODE system components.
pub mod algorithm;
pub mod implicit;
pub mod lawson;
pub mod model;
pub mod monte_carlo;
pub mod rk;
pub mod saving;
pub mod solvers;
mod stage;
pub mod state;
pub mod stepping;
pub mod tableau;

pub use algorithm::{Algorithm, Capabilities, Scheme};
pub use implicit::{FixedPointIteration, ImplicitSolveErrors, ImplicitStageSolver, InitialGuess};
pub use lawson::ExponentialAction;
pub use model::{ModelError, OdeModel};
pub use rk::{Method, MethodErrors, StepErrors};
pub use saving::{CsvObserver, MemoryResult, Observer};
pub use solvers::{Solution, SolveErrors, Stats};
pub use state::{Integrable, state_array::StateArray, state_vector::StateVector};
pub use stepping::{SolveOptions, StepResult, StepStatus};
pub use tableau::{ButcherTableau, TableauErrors, TableauKind, TableauSpec};
pub use tolerance::{ErrorNorm, Tolerance};

/// A model together with the limits used when it is solved.
pub struct OdeProblem<Model> {
    pub model: Model,
    pub options: SolveOptions,
}

impl<Model> OdeProblem<Model> {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            options: SolveOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs [`solvers::solve`] on this problem.
    pub fn solve<State, Obs, const STAGES: usize>(
        &mut self,
        method: &mut Method<State, STAGES>,
        y0: &State,
        tspan: (f64, f64),
        dt: f64,
        observer: &mut Obs,
    ) -> Result<Solution<State>, SolveErrors>
    where
        State: Integrable,
        Model: OdeModel<State>,
        Obs: Observer<State> + ?Sized,
    {
        solvers::solve(
            &mut self.model,
            method,
            y0,
            tspan,
            dt,
            observer,
            &self.options,
        )
    }
}
