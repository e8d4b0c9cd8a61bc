use rand::{Rng, SeedableRng, rngs::SmallRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    Integrable, OdeModel,
    rk::{Method, MethodErrors},
    saving::MemoryResult,
    solvers::{Solution, SolveErrors, solve},
    stepping::SolveOptions,
};

#[derive(Debug, Error)]
pub enum MonteCarloErrors {
    #[error("could not build the method for run {run}")]
    Method {
        run: usize,
        #[source]
        source: MethodErrors,
    },
    #[error("run {run} failed")]
    Run {
        run: usize,
        #[source]
        source: SolveErrors,
    },
}

/// Number of trajectories and the seed all of their generators derive from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonteCarloProblem {
    pub nruns: usize,
    pub seed: u64,
}

impl MonteCarloProblem {
    pub fn new(nruns: usize, seed: u64) -> Self {
        Self { nruns, seed }
    }

    /// One seed per run, drawn in order from a generator seeded with `self.seed`.
    pub fn seeds(&self) -> Vec<u64> {
        let mut rng = SmallRng::seed_from_u64(self.seed);
        (0..self.nruns).map(|_| rng.random()).collect()
    }
}

/// One trajectory of an ensemble.
#[derive(Clone, Debug)]
pub struct MonteCarloRun<State> {
    pub solution: Solution<State>,
    pub result: MemoryResult<State>,
}

/// Solves `problem.nruns` independent trajectories in parallel.
///
/// `build` receives the run index and a generator seeded for that run, and returns the model
/// and method of the run, so random parameters or forcing live inside the model. Seeds are
/// drawn before any run starts, so the output only depends on `problem.seed`. Runs are
/// returned in index order.
pub fn solve_monte_carlo<State, Model, Build, const STAGES: usize>(
    problem: &MonteCarloProblem,
    build: Build,
    y0: &State,
    tspan: (f64, f64),
    dt: f64,
    options: &SolveOptions,
) -> Result<Vec<MonteCarloRun<State>>, MonteCarloErrors>
where
    State: Integrable + Send + Sync,
    Model: OdeModel<State>,
    Build: Fn(usize, &mut SmallRng) -> Result<(Model, Method<State, STAGES>), MethodErrors> + Sync,
{
    problem
        .seeds()
        .into_par_iter()
        .enumerate()
        .map(|(run, seed)| {
            let mut rng = SmallRng::seed_from_u64(seed);
            let (mut model, mut method) =
                build(run, &mut rng).map_err(|source| MonteCarloErrors::Method { run, source })?;

            let mut result = MemoryResult::new(0);
            let solution = solve(&mut model, &mut method, y0, tspan, dt, &mut result, options)
                .map_err(|source| MonteCarloErrors::Run { run, source })?;
            result.shrink_to_fit();

            Ok(MonteCarloRun { solution, result })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{algorithm::Algorithm, model::ModelError, tableau::ButcherTableau};

    /// Decay driven by a random forcing drawn at every evaluation.
    struct Forced {
        rng: SmallRng,
        sigma: f64,
    }

    impl OdeModel<f64> for Forced {
        fn f(&mut self, _t: f64, y: &f64, dy: &mut f64) -> Result<(), ModelError> {
            *dy = -y + self.sigma * self.rng.random_range(-1.0..1.0);
            Ok(())
        }
    }

    fn run(seed: u64) -> Vec<MonteCarloRun<f64>> {
        solve_monte_carlo(
            &MonteCarloProblem::new(8, seed),
            |_run, rng: &mut SmallRng| {
                let model = Forced {
                    rng: SmallRng::seed_from_u64(rng.random()),
                    sigma: 0.5,
                };
                let method = Method::new(Algorithm::explicit(ButcherTableau::<4>::RK4), &0.0)?;
                Ok((model, method))
            },
            &1.0,
            (0.0, 1.0),
            0.01,
            &SolveOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn same_seed_same_trajectories() {
        let first = run(42);
        let second = run(42);
        assert_eq!(first.len(), 8);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.result.y, b.result.y);
            assert_eq!(a.solution, b.solution);
        }
        // runs use different streams
        assert_ne!(first[0].result.y, first[1].result.y);
    }

    #[test]
    fn different_seeds_differ() {
        let first = run(1);
        let second = run(2);
        assert_ne!(first[0].solution.y, second[0].solution.y);
    }

    #[test]
    fn build_errors_name_the_run() {
        let err = solve_monte_carlo(
            &MonteCarloProblem::new(3, 0),
            |run, _rng: &mut SmallRng| {
                let algorithm = if run == 2 {
                    Algorithm::explicit(ButcherTableau::<4>::RK4).with_tolerance(1e-6)
                } else {
                    Algorithm::explicit(ButcherTableau::<4>::RK4)
                };
                Ok((|_t: f64, y: &f64| -y, Method::new(algorithm, &0.0)?))
            },
            &1.0,
            (0.0, 1.0),
            0.1,
            &SolveOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MonteCarloErrors::Method { run: 2, .. }));
    }

    #[test]
    fn seeds_are_reproducible() {
        let problem = MonteCarloProblem::new(4, 7);
        assert_eq!(problem.seeds(), problem.seeds());
        assert_eq!(problem.seeds().len(), 4);
    }
}
