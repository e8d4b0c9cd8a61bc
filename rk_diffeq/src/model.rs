use std::error::Error;

/// Error returned by user callbacks (right-hand sides, observers).
pub type ModelError = Box<dyn Error + Send + Sync>;

/// Trait for defining a dynamical system model that can be numerically integrated.
///
/// Types implementing this trait must define how to compute the derivative (or RHS function)
/// of the ODE at a given time and state. Closures `FnMut(f64, &State) -> State` implement it
/// directly.
pub trait OdeModel<State> {
    /// Compute the derivative at time `t` and state `state`, storing the result in `derivative`.
    fn f(&mut self, t: f64, state: &State, derivative: &mut State) -> Result<(), ModelError>;
}

impl<State, F> OdeModel<State> for F
where
    F: FnMut(f64, &State) -> State,
{
    fn f(&mut self, t: f64, state: &State, derivative: &mut State) -> Result<(), ModelError> {
        *derivative = self(t, state);
        Ok(())
    }
}
