/// Action of the exponential of the linear operator `L` of a split problem
/// `u' = L u + N(t, u)` on a state: `apply(theta, u) = exp(theta * L) u`.
///
/// Lawson methods call it with `theta` equal to multiples of the step size, and with
/// `theta = 0` for stages where `c_i == c_j`, which must return `u` unchanged.
pub trait ExponentialAction<State> {
    fn apply(&mut self, theta: f64, state: &State) -> State;
}

impl<State, F> ExponentialAction<State> for F
where
    F: FnMut(f64, &State) -> State,
{
    fn apply(&mut self, theta: f64, state: &State) -> State {
        self(theta, state)
    }
}

/// `exp(theta * lambda) u` for a scalar linear term `lambda * u`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScalarExponential {
    pub lambda: f64,
}

impl ScalarExponential {
    pub fn new(lambda: f64) -> Self {
        Self { lambda }
    }
}

impl ExponentialAction<f64> for ScalarExponential {
    fn apply(&mut self, theta: f64, state: &f64) -> f64 {
        (theta * self.lambda).exp() * state
    }
}
