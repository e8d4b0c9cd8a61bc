use log::{debug, trace, warn};
use serde::Serialize;
use thiserror::Error;

use crate::{
    Integrable, OdeModel,
    rk::{Method, StepErrors},
    saving::{Observer, ObserverError},
    stepping::{SolveOptions, StepStatus},
};

#[derive(Debug, Error)]
pub enum SolveErrors {
    #[error("time span must be finite with end > start, got ({start}, {end})")]
    InvalidSpan { start: f64, end: f64 },
    #[error("initial step size must be positive and finite, got {0}")]
    InvalidStep(f64),
    #[error("step failed at t = {t}")]
    Step {
        t: f64,
        #[source]
        source: StepErrors,
    },
    #[error("observer failed at t = {t}")]
    Observer {
        t: f64,
        #[source]
        source: ObserverError,
    },
    #[error("step size underflow at t = {t} (dt = {dt:e})")]
    StepSizeUnderflow { t: f64, dt: f64 },
    #[error("error estimate is not finite at t = {t}")]
    NonFiniteStep { t: f64 },
    #[error("reached the maximum of {iterations} step attempts at t = {t}")]
    MaxIterations { t: f64, iterations: usize },
}

/// Counters of one solve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub accepted: usize,
    pub rejected: usize,
    /// Right-hand-side evaluations made during this solve.
    pub evaluations: usize,
}

/// Final point of a solve.
#[derive(Clone, Debug, PartialEq)]
pub struct Solution<State> {
    pub t: f64,
    pub y: State,
    pub stats: Stats,
}

/// Integrates `model` from `tspan.0` to `tspan.1` starting at `y0` with initial step `dt`.
///
/// Rejected attempts are retried from the same point with the proposed step size. Accepted
/// and fixed attempts move to the method's candidate and are reported to `observer`, which
/// sees the initial condition only when [`SolveOptions::observe_initial`] is set. Step
/// sizes are clamped by `options`, and the final step is shortened to land on `tspan.1`.
pub fn solve<State, Model, Obs, const STAGES: usize>(
    model: &mut Model,
    method: &mut Method<State, STAGES>,
    y0: &State,
    tspan: (f64, f64),
    dt: f64,
    observer: &mut Obs,
    options: &SolveOptions,
) -> Result<Solution<State>, SolveErrors>
where
    State: Integrable,
    Model: OdeModel<State>,
    Obs: Observer<State> + ?Sized,
{
    let (start, end) = tspan;
    if !(start.is_finite() && end.is_finite() && end > start) {
        return Err(SolveErrors::InvalidSpan { start, end });
    }
    if !(dt.is_finite() && dt > 0.0) {
        return Err(SolveErrors::InvalidStep(dt));
    }

    // remainders shorter than this are folded into the previous step
    let absorb = 1e-12 * end.abs().max(1.0);
    let first_evaluation = method.evaluations();
    let mut stats = Stats::default();
    let mut t = start;
    let mut y = y0.clone();
    let mut dt = options.clamp(dt);
    let mut iterations = 0;

    if options.observe_initial {
        observer
            .observe(t, &y, 0.0)
            .map_err(|source| SolveErrors::Observer { t, source })?;
    }

    while t < end {
        if iterations >= options.max_iterations {
            warn!("giving up at t = {t} after {iterations} step attempts");
            return Err(SolveErrors::MaxIterations { t, iterations });
        }
        iterations += 1;

        let remaining = end - t;
        let last = dt >= remaining - absorb;
        let h = if last { remaining } else { dt };
        if !last && t + h <= t {
            warn!("step size {h:e} no longer advances t = {t}");
            return Err(SolveErrors::StepSizeUnderflow { t, dt: h });
        }

        let result = method
            .step(model, t, &y, h)
            .map_err(|source| SolveErrors::Step { t, source })?;

        match result.status {
            StepStatus::Rejected => {
                stats.rejected += 1;
                trace!(
                    "rejected step at t = {t}: dt = {h:e}, error = {:e}, retrying with {:e}",
                    result.error.unwrap_or(f64::NAN),
                    result.dt
                );
                if !result.dt.is_finite() {
                    warn!("non-finite error estimate at t = {t}");
                    return Err(SolveErrors::NonFiniteStep { t });
                }
                if options.at_min_dt(dt) {
                    warn!("step rejected at the minimum step size {dt:e} at t = {t}");
                    return Err(SolveErrors::StepSizeUnderflow { t, dt });
                }
                dt = options.clamp(result.dt);
            }
            StepStatus::Accepted | StepStatus::Fixed => {
                stats.accepted += 1;
                t = if last { end } else { t + h };
                y.clone_from(method.candidate());
                observer
                    .observe(t, &y, h)
                    .map_err(|source| SolveErrors::Observer { t, source })?;
                if result.status == StepStatus::Accepted {
                    dt = options.clamp(result.dt);
                }
            }
        }
    }

    stats.evaluations = method.evaluations() - first_evaluation;
    debug!(
        "solve finished at t = {t}: {} accepted, {} rejected, {} evaluations",
        stats.accepted, stats.rejected, stats.evaluations
    );

    Ok(Solution { t, y, stats })
}
