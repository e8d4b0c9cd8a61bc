use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rk_diffeq::{
    Algorithm, ButcherTableau, Method, SolveOptions, StateArray, StateVector, solvers::solve,
};

// Pendulum with angle and angular velocity.
fn pendulum(_t: f64, x: &StateArray<2>) -> StateArray<2> {
    let (g, l) = (9.81, 1.0);
    StateArray::new([x[1], -(g / l) * x[0].sin()])
}

fn run_fixed() {
    let x0 = StateArray::new([1.0, 0.0]);
    let mut method = Method::new(Algorithm::explicit(ButcherTableau::<4>::RK4), &x0).unwrap();
    let solution = solve(
        &mut pendulum,
        &mut method,
        &x0,
        (0.0, 100.0),
        0.01,
        &mut |_t: f64, _x: &StateArray<2>, _dt: f64| {},
        &SolveOptions::default(),
    )
    .unwrap();
    black_box(solution);
}

fn run_adaptive() {
    let x0 = StateArray::new([1.0, 0.0]);
    let algorithm = Algorithm::explicit(ButcherTableau::<7>::DORMAND_PRINCE).with_tolerance(1e-8);
    let mut method = Method::new(algorithm, &x0).unwrap();
    let solution = solve(
        &mut pendulum,
        &mut method,
        &x0,
        (0.0, 100.0),
        0.01,
        &mut |_t: f64, _x: &StateArray<2>, _dt: f64| {},
        &SolveOptions::default(),
    )
    .unwrap();
    black_box(solution);
}

fn run_heat_lawson() {
    // 1-d heat equation with a diagonal (modal) operator and cubic reaction
    let n = 64;
    let decay: Vec<f64> = (1..=n).map(|k| -((k * k) as f64)).collect();
    let exponential = move |theta: f64, u: &StateVector| {
        StateVector::new(
            u.iter()
                .zip(&decay)
                .map(|(u, lambda)| (theta * lambda).exp() * u)
                .collect(),
        )
    };
    let mut reaction = |_t: f64, u: &StateVector| {
        StateVector::new(u.iter().map(|u| u - u * u * u).collect())
    };
    let u0 = StateVector::new(vec![0.1; n]);
    let mut method = Method::new(
        Algorithm::lawson(ButcherTableau::<4>::RK4, exponential),
        &u0,
    )
    .unwrap();
    let solution = solve(
        &mut reaction,
        &mut method,
        &u0,
        (0.0, 1.0),
        1e-3,
        &mut |_t: f64, _u: &StateVector, _dt: f64| {},
        &SolveOptions::default(),
    )
    .unwrap();
    black_box(solution);
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("rk4 pendulum", |b| b.iter(run_fixed));
    c.bench_function("dopri45 pendulum", |b| b.iter(run_adaptive));
    c.bench_function("lawson rk4 heat", |b| b.iter(run_heat_lawson));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
