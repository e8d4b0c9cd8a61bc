use serde::{Deserialize, Serialize};

/// Safety factor applied to the optimal step size.
pub const SAFETY: f64 = 0.9;

/// Proposed next step size from the error of the last attempt.
///
/// `dt_new = 0.9 * (tol / err)^(1 / order) * dt`, with `order` the order of the primary
/// weights. An error of zero gives an infinite step; callers clamp it.
pub fn next_step_size(dt: f64, error: f64, tol: f64, order: usize) -> f64 {
    SAFETY * (tol / error).powf(1.0 / order as f64) * dt
}

/// Outcome of one stepper call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    /// No error estimate was computed.
    Fixed,
    /// Estimated error was within tolerance.
    Accepted,
    /// Estimated error exceeded tolerance.
    Rejected,
}

/// Result of [`Method::step`](crate::rk::Method::step).
///
/// For fixed steps `t = tn + dt`, `u` is the new state and `dt` is unchanged. For adaptive
/// steps the pairing is: accepted returns `(tn, un, dt_new)`, rejected returns
/// `(tn + dt, u_primary, dt_new)`. `status` says which case applies; the candidate solution
/// is always available from [`Method::candidate`](crate::rk::Method::candidate).
#[derive(Clone, Debug, PartialEq)]
pub struct StepResult<State> {
    pub t: f64,
    pub u: State,
    pub dt: f64,
    pub status: StepStatus,
    /// Error norm of the attempt, `None` for fixed steps.
    pub error: Option<f64>,
}

/// Limits imposed by the time-loop driver.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    /// Maximum number of step attempts, accepted and rejected.
    pub max_iterations: usize,
    /// Smallest step size the driver will propose.
    pub min_dt: Option<f64>,
    /// Largest step size the driver will propose.
    pub max_dt: Option<f64>,
    /// Also report the initial condition to the observer, with `dt = 0`.
    pub observe_initial: bool,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_iterations: 1_000_000,
            min_dt: None,
            max_dt: None,
            observe_initial: false,
        }
    }
}

impl SolveOptions {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_min_dt(mut self, min_dt: f64) -> Self {
        self.min_dt = Some(min_dt);
        self
    }

    pub fn with_max_dt(mut self, max_dt: f64) -> Self {
        self.max_dt = Some(max_dt);
        self
    }

    pub fn with_observe_initial(mut self, observe_initial: bool) -> Self {
        self.observe_initial = observe_initial;
        self
    }

    /// Clamps a proposed step size into `[min_dt, max_dt]`.
    pub fn clamp(&self, dt: f64) -> f64 {
        let mut dt = dt;
        if let Some(max_dt) = self.max_dt {
            dt = dt.min(max_dt);
        }
        if let Some(min_dt) = self.min_dt {
            dt = dt.max(min_dt);
        }
        dt
    }

    /// True when `dt` is at (or below) the lower bound.
    pub fn at_min_dt(&self, dt: f64) -> bool {
        self.min_dt.is_some_and(|min_dt| dt <= min_dt)
    }
}
