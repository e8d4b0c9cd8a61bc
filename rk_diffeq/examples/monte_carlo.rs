use rand::{Rng, SeedableRng, rngs::SmallRng};
use rk_diffeq::{
    Algorithm, ButcherTableau, Method, ModelError, OdeModel, SolveOptions, StateArray,
    monte_carlo::{MonteCarloProblem, solve_monte_carlo},
};
use std::error::Error;

/// Damped oscillator with sampled parameters and a random forcing (Brownian-like kicks).
#[derive(Debug)]
struct DampedOscillator {
    spring_constant: f64,
    damping: f64,
    forcing: f64,
    rng: SmallRng,
}

impl OdeModel<StateArray<2>> for DampedOscillator {
    fn f(&mut self, _t: f64, x: &StateArray<2>, dx: &mut StateArray<2>) -> Result<(), ModelError> {
        let kick = self.forcing * self.rng.random_range(-1.0..1.0);
        dx[0] = x[1];
        dx[1] = -self.spring_constant * x[0] - self.damping * x[1] + kick;
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let problem = MonteCarloProblem::new(10, 0);
    let x0 = StateArray::new([0.5, 0.0]);

    let runs = solve_monte_carlo(
        &problem,
        |_run, rng: &mut SmallRng| {
            let model = DampedOscillator {
                spring_constant: rng.random_range(0.9..1.1),
                damping: rng.random_range(0.05..0.15),
                forcing: 0.1,
                rng: SmallRng::seed_from_u64(rng.random()),
            };
            let method = Method::new(Algorithm::explicit(ButcherTableau::<4>::RK4), &x0)?;
            Ok((model, method))
        },
        &x0,
        (0.0, 20.0),
        0.01,
        &SolveOptions::default(),
    )?;

    for (i, run) in runs.iter().enumerate() {
        println!(
            "run {i:2}: x(20) = {:10.6}  v(20) = {:10.6}  ({} steps)",
            run.solution.y[0], run.solution.y[1], run.solution.stats.accepted
        );
    }
    Ok(())
}
