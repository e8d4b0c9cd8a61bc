use rk_diffeq::{
    Algorithm, ButcherTableau, FixedPointIteration, InitialGuess, MemoryResult, Method,
    OdeProblem,
};
use std::error::Error;

// Ralston's method with Euler embedded, as it would be stored in a data file
const RALSTON_EULER: &str = r#"(
    label: "Ralston-Euler 2(1)",
    order: 2,
    kind: Explicit,
    embedded: true,
    a: [[0.0, 0.0], [0.6666666666666666, 0.0]],
    b: [0.25, 0.75],
    b2: Some([1.0, 0.0]),
    c: [0.0, 0.6666666666666666],
)"#;

fn main() -> Result<(), Box<dyn Error>> {
    let tableau = ButcherTableau::<2>::from_ron(RALSTON_EULER)?;
    println!("loaded '{}' (order {})", tableau.label(), tableau.order());

    let mut problem = OdeProblem::new(|t: f64, y: &f64| -2.0 * t * y);
    let exact = (-1.0_f64).exp();

    let mut method = Method::new(Algorithm::explicit(tableau).with_tolerance(1e-5), &1.0)?;
    let mut result = MemoryResult::new(0);
    let solution = problem.solve(&mut method, &1.0, (0.0, 1.0), 0.1, &mut result)?;
    println!(
        "ralston-euler: y(1) = {:.8} (error {:.2e}) in {} steps, {} rejected",
        solution.y,
        (solution.y - exact).abs(),
        solution.stats.accepted,
        solution.stats.rejected
    );

    let algorithm =
        Algorithm::diagonally_implicit(ButcherTableau::<2>::SDIRK2, FixedPointIteration::default())
            .with_initial_guess(InitialGuess::PreviousStage);
    let mut method = Method::new(algorithm, &1.0)?;
    let solution = problem.solve(&mut method, &1.0, (0.0, 1.0), 0.01, &mut result)?;
    println!(
        "sdirk2: y(1) = {:.8} (error {:.2e}), {} evaluations",
        solution.y,
        (solution.y - exact).abs(),
        solution.stats.evaluations
    );
    Ok(())
}
