use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Integrable, model::ModelError};

#[derive(Debug, Error)]
pub enum ImplicitSolveErrors {
    #[error("implicit stage did not converge after {iterations} iterations (residual {residual:e})")]
    NotConverged { iterations: usize, residual: f64 },
    #[error("model evaluation failed inside the implicit stage")]
    Model(#[source] ModelError),
}

/// Residual function handed to an [`ImplicitStageSolver`].
///
/// `g(k, out)` writes `f(t_i, base + dt * a_ii * k)` into `out`, so the stage derivative is
/// the fixed point `k = g(k)`.
pub type StageFunction<'a, State> = dyn FnMut(&State, &mut State) -> Result<(), ModelError> + 'a;

/// Nonlinear solver for the stage equation of a diagonally implicit method.
pub trait ImplicitStageSolver<State> {
    /// Solves `k = g(k)` in place.
    ///
    /// `k` holds the initial guess on entry and the solution on success, `scratch` is a
    /// buffer of the same shape the solver may overwrite. Returns the number of iterations.
    fn solve(
        &mut self,
        g: &mut StageFunction<'_, State>,
        k: &mut State,
        scratch: &mut State,
    ) -> Result<usize, ImplicitSolveErrors>;
}

/// Where the stage solver starts from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitialGuess {
    #[default]
    Zero,
    /// The derivative of the previous stage, or `f(tn, un)` for the first stage.
    PreviousStage,
}

/// Picard iteration `k <- g(k)`, converged once every component of successive iterates
/// satisfies `|a - b| <= tolerance * (1 + max(|a|, |b|))`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedPointIteration {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for FixedPointIteration {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-10,
        }
    }
}

impl FixedPointIteration {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

impl<State: Integrable> ImplicitStageSolver<State> for FixedPointIteration {
    fn solve(
        &mut self,
        g: &mut StageFunction<'_, State>,
        k: &mut State,
        scratch: &mut State,
    ) -> Result<usize, ImplicitSolveErrors> {
        let mut residual = f64::INFINITY;
        for iteration in 1..=self.max_iterations {
            g(&*k, &mut *scratch).map_err(ImplicitSolveErrors::Model)?;
            residual = max_scaled_difference(k.components(), scratch.components());
            std::mem::swap(k, scratch);
            if residual <= self.tolerance {
                return Ok(iteration);
            }
        }
        Err(ImplicitSolveErrors::NotConverged {
            iterations: self.max_iterations,
            residual,
        })
    }
}

/// Largest component difference, relative to the component size once it exceeds one.
fn max_scaled_difference(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(a, b)| (a - b).abs() / (1.0 + a.abs().max(b.abs())))
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn solve_scalar(
        solver: &mut FixedPointIteration,
        g: &mut StageFunction<'_, f64>,
    ) -> Result<(usize, f64), ImplicitSolveErrors> {
        let (mut k, mut scratch) = (0.0, 0.0);
        let iterations = solver.solve(g, &mut k, &mut scratch)?;
        Ok((iterations, k))
    }

    // k = 1 - 0.5 k  =>  k = 2/3
    fn contraction(k: &f64, out: &mut f64) -> Result<(), ModelError> {
        *out = 1.0 - 0.5 * k;
        Ok(())
    }

    #[test]
    fn converges_to_contraction_fixed_point() {
        let (iterations, k) =
            solve_scalar(&mut FixedPointIteration::default(), &mut contraction).unwrap();
        assert!(iterations > 1 && iterations <= 50);
        assert_abs_diff_eq!(k, 2.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn reports_non_convergence() {
        let mut solver = FixedPointIteration::default().with_max_iterations(1);
        let err = solve_scalar(&mut solver, &mut contraction).unwrap_err();
        assert!(matches!(err, ImplicitSolveErrors::NotConverged { iterations: 1, .. }));
    }

    #[test]
    fn forwards_model_errors() {
        let mut g = |_: &f64, _: &mut f64| -> Result<(), ModelError> { Err("boom".into()) };
        let err = solve_scalar(&mut FixedPointIteration::default(), &mut g).unwrap_err();
        assert!(matches!(err, ImplicitSolveErrors::Model(_)));
    }

    #[test]
    fn large_iterates_converge_relative_to_their_size() {
        // k = -9e9 - 0.9 k: one ulp of k is far above the tolerance in absolute terms
        let mut g = |k: &f64, out: &mut f64| -> Result<(), ModelError> {
            *out = -9e9 - 0.9 * k;
            Ok(())
        };
        let mut solver = FixedPointIteration::default().with_max_iterations(10_000);
        let (iterations, k) = solve_scalar(&mut solver, &mut g).unwrap();
        assert!(iterations < 1_000);
        assert_abs_diff_eq!(k / (-9e9 / 1.9), 1.0, epsilon = 1e-8);
    }

    #[test]
    fn settings_from_ron() {
        let solver: FixedPointIteration = ron::from_str("(max_iterations: 7)").unwrap();
        assert_eq!(solver.max_iterations, 7);
        assert_eq!(solver.tolerance, 1e-10);
    }
}
