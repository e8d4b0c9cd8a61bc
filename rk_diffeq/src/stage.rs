use std::array;

use crate::{
    Integrable, OdeModel,
    implicit::{ImplicitStageSolver, InitialGuess},
    lawson::ExponentialAction,
    rk::StepErrors,
    tableau::ButcherTableau,
};

/// Position of one stage inside a step.
pub(crate) struct Stage<'a, State, const STAGES: usize> {
    pub tableau: &'a ButcherTableau<STAGES>,
    pub index: usize,
    pub tn: f64,
    pub un: &'a State,
    pub dt: f64,
}

impl<State, const STAGES: usize> Stage<'_, State, STAGES> {
    pub fn time(&self) -> f64 {
        self.tn + self.tableau.c()[self.index] * self.dt
    }

    /// `(dt * A[i][j], j)` for the non-zero entries left of the diagonal.
    fn weights(&self) -> impl Iterator<Item = (f64, usize)> + '_ {
        let row = &self.tableau.a()[self.index];
        (0..self.index)
            .filter(move |&j| row[j] != 0.0)
            .map(move |j| (self.dt * row[j], j))
    }
}

// preallocated buffers for one step, sized from the initial state and reused every step
#[derive(Debug)]
pub(crate) struct StageBuffer<State, const STAGES: usize> {
    pub k: [State; STAGES],
    pub y_stage: State,
    pub scaled: State,
    pub iterate: State,
    pub residual: State,
    pub primary: State,
    pub secondary: State,
}

/// `out = base + Σ w_j * k_j`, skipping zero weights.
fn accumulate<'k, State: Integrable + 'k>(
    out: &mut State,
    scaled: &mut State,
    base: &State,
    terms: impl Iterator<Item = (f64, &'k State)>,
) {
    out.clone_from(base);
    for (weight, k) in terms {
        if weight != 0.0 {
            scaled.clone_from(k);
            *scaled *= weight;
            *out += &*scaled;
        }
    }
}

fn evaluate<State, Model: OdeModel<State>>(
    model: &mut Model,
    t: f64,
    state: &State,
    derivative: &mut State,
) -> Result<(), StepErrors> {
    model
        .f(t, state, derivative)
        .map_err(|source| StepErrors::Model { t, source })
}

impl<State: Integrable, const STAGES: usize> StageBuffer<State, STAGES> {
    pub fn new(shadow: &State) -> Self {
        Self {
            k: array::from_fn(|_| shadow.zeros_like()),
            y_stage: shadow.zeros_like(),
            scaled: shadow.zeros_like(),
            iterate: shadow.zeros_like(),
            residual: shadow.zeros_like(),
            primary: shadow.zeros_like(),
            secondary: shadow.zeros_like(),
        }
    }

    /// `k_i = f(tn + c_i dt, un + dt Σ_{j<i} A[i][j] k_j)`. Returns the number of model calls.
    pub fn explicit_stage<Model: OdeModel<State>>(
        &mut self,
        stage: &Stage<'_, State, STAGES>,
        model: &mut Model,
    ) -> Result<usize, StepErrors> {
        let (done, rest) = self.k.split_at_mut(stage.index);
        let done: &[State] = done;
        accumulate(
            &mut self.y_stage,
            &mut self.scaled,
            stage.un,
            stage.weights().map(move |(w, j)| (w, &done[j])),
        );
        evaluate(model, stage.time(), &self.y_stage, &mut rest[0])?;
        Ok(1)
    }

    /// Solves `k_i = f(tn + c_i dt, un + dt Σ_{j<=i} A[i][j] k_j)` for `k_i`.
    ///
    /// A zero diagonal entry falls back to the explicit stage.
    pub fn implicit_stage<Model: OdeModel<State>>(
        &mut self,
        stage: &Stage<'_, State, STAGES>,
        model: &mut Model,
        solver: &mut dyn ImplicitStageSolver<State>,
        guess: InitialGuess,
    ) -> Result<usize, StepErrors> {
        let i = stage.index;
        let diagonal = stage.tableau.a()[i][i];
        if diagonal == 0.0 {
            return self.explicit_stage(stage, model);
        }

        let Self {
            k,
            y_stage,
            scaled,
            iterate,
            residual,
            ..
        } = self;
        let (done, rest) = k.split_at_mut(i);
        let done: &[State] = done;
        let ki = &mut rest[0];

        // base point without the stage's own contribution
        accumulate(
            y_stage,
            scaled,
            stage.un,
            stage.weights().map(move |(w, j)| (w, &done[j])),
        );

        let mut evaluations = 0;
        match guess {
            InitialGuess::Zero => ki.set_zero(),
            InitialGuess::PreviousStage => match done.last() {
                Some(previous) => ki.clone_from(previous),
                None => {
                    evaluate(model, stage.tn, stage.un, ki)?;
                    evaluations += 1;
                }
            },
        }

        let t = stage.time();
        let h = stage.dt * diagonal;
        let base: &State = y_stage;
        let mut g = |k: &State, out: &mut State| {
            iterate.clone_from(base);
            scaled.clone_from(k);
            *scaled *= h;
            *iterate += &*scaled;
            evaluations += 1;
            model.f(t, iterate, out)
        };

        solver
            .solve(&mut g, ki, residual)
            .map_err(|source| StepErrors::ImplicitStage { stage: i, source })?;
        Ok(evaluations)
    }

    /// Lawson stage: `y_i = e^{c_i dt L} un + dt Σ_{j<i} A[i][j] e^{(c_i - c_j) dt L} k_j`,
    /// `k_i = N(tn + c_i dt, y_i)`.
    pub fn lawson_stage<Model: OdeModel<State>>(
        &mut self,
        stage: &Stage<'_, State, STAGES>,
        model: &mut Model,
        exponential: &mut dyn ExponentialAction<State>,
    ) -> Result<usize, StepErrors> {
        let c = stage.tableau.c();
        let i = stage.index;
        let (done, rest) = self.k.split_at_mut(i);

        self.y_stage = exponential.apply(c[i] * stage.dt, stage.un);
        for (w, j) in stage.weights() {
            let mut term = exponential.apply((c[i] - c[j]) * stage.dt, &done[j]);
            term *= w;
            self.y_stage += &term;
        }
        evaluate(model, stage.time(), &self.y_stage, &mut rest[0])?;
        Ok(1)
    }

    /// `primary = un + dt Σ b_i k_i`, and the same with b2 into `secondary` when asked.
    pub fn combine(
        &mut self,
        tableau: &ButcherTableau<STAGES>,
        un: &State,
        dt: f64,
        with_secondary: bool,
    ) {
        let k = &self.k;
        accumulate(
            &mut self.primary,
            &mut self.scaled,
            un,
            tableau.b().iter().zip(k).map(|(b, k)| (dt * b, k)),
        );
        if let (true, Some(b2)) = (with_secondary, tableau.b2()) {
            accumulate(
                &mut self.secondary,
                &mut self.scaled,
                un,
                b2.iter().zip(k).map(|(b, k)| (dt * b, k)),
            );
        }
    }

    /// `primary = e^{dt L} un + dt Σ b_i e^{(1 - c_i) dt L} k_i`, secondary likewise with b2.
    pub fn combine_lawson(
        &mut self,
        tableau: &ButcherTableau<STAGES>,
        un: &State,
        dt: f64,
        with_secondary: bool,
        exponential: &mut dyn ExponentialAction<State>,
    ) {
        let b2 = tableau.b2().filter(|_| with_secondary);

        self.primary = exponential.apply(dt, un);
        if b2.is_some() {
            self.secondary.clone_from(&self.primary);
        }
        for (i, k) in self.k.iter().enumerate() {
            let b = tableau.b()[i];
            let b2_i = b2.map_or(0.0, |b2| b2[i]);
            if b == 0.0 && b2_i == 0.0 {
                continue;
            }
            let propagated = exponential.apply((1.0 - tableau.c()[i]) * dt, k);
            if b != 0.0 {
                self.scaled.clone_from(&propagated);
                self.scaled *= dt * b;
                self.primary += &self.scaled;
            }
            if b2_i != 0.0 {
                self.scaled.clone_from(&propagated);
                self.scaled *= dt * b2_i;
                self.secondary += &self.scaled;
            }
        }
    }
}
