use rk_diffeq::{
    Algorithm, ButcherTableau, CsvObserver, MemoryResult, Method, ModelError, OdeModel,
    OdeProblem, SolveOptions, StateArray,
};
use std::error::Error;

struct Lorenz {
    sigma: f64,
    rho: f64,
    beta: f64,
}

impl OdeModel<StateArray<3>> for Lorenz {
    fn f(&mut self, _t: f64, x: &StateArray<3>, dx: &mut StateArray<3>) -> Result<(), ModelError> {
        dx[0] = self.sigma * (x[1] - x[0]);
        dx[1] = x[0] * (self.rho - x[2]) - x[1];
        dx[2] = x[0] * x[1] - self.beta * x[2];
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let model = Lorenz {
        sigma: 10.,
        rho: 28.,
        beta: 8. / 3.,
    };
    let x0 = StateArray::new([1.0, 0.0, 0.0]); // Initial conditions for x, y, z

    let mut problem = OdeProblem::new(model).with_options(
        SolveOptions::default()
            .with_max_dt(0.01)
            .with_observe_initial(true),
    );

    // fixed step RK4, kept in memory
    let mut method = Method::new(Algorithm::explicit(ButcherTableau::<4>::RK4), &x0)?;
    let mut result = MemoryResult::new(30_001);
    problem.solve(&mut method, &x0, (0.0, 30.0), 0.001, &mut result)?;
    for i in 0..result.t.len() {
        if result.t[i] - result.t[i].floor() < 1e-4 {
            println!(
                "{:10.6}     {:10.6}     {:10.6}     {:10.6}", // 10 chars wide, 6 decimal places
                result.t[i], result.y[i][0], result.y[i][1], result.y[i][2]
            );
        }
    }

    // adaptive Dormand-Prince written to csv
    let algorithm = Algorithm::explicit(ButcherTableau::<7>::DORMAND_PRINCE).with_tolerance(1e-8);
    let mut method = Method::new(algorithm, &x0)?;
    let path = std::env::temp_dir().join("lorenz.csv");
    let mut writer = CsvObserver::create(&path)?;
    let solution = problem.solve(&mut method, &x0, (0.0, 30.0), 0.001, &mut writer)?;
    writer.finish()?;
    println!(
        "dopri45: {} accepted, {} rejected, {} evaluations, written to {}",
        solution.stats.accepted,
        solution.stats.rejected,
        solution.stats.evaluations,
        path.display()
    );
    Ok(())
}
