use std::sync::Arc;

use thiserror::Error;
use tolerance::Tolerance;

use crate::{
    Integrable, OdeModel,
    algorithm::{Algorithm, Capabilities, Scheme},
    implicit::ImplicitSolveErrors,
    model::ModelError,
    stage::{Stage, StageBuffer},
    stepping::{StepResult, StepStatus, next_step_size},
    tableau::{ButcherTableau, TableauErrors, TableauKind},
};

#[derive(Debug, Error)]
pub enum MethodErrors {
    #[error(transparent)]
    Tableau(#[from] TableauErrors),
    #[error("tolerance must be positive and finite, got {0}")]
    InvalidTolerance(f64),
    #[error("tableau '{0}' has no embedded weights, a tolerance cannot be used")]
    ToleranceWithoutEmbeddedPair(String),
    #[error("{scheme} scheme cannot run the {kind:?} tableau '{label}'")]
    IncompatibleTableau {
        scheme: &'static str,
        kind: TableauKind,
        label: String,
    },
}

#[derive(Debug, Error)]
pub enum StepErrors {
    #[error("model evaluation failed at t = {t}")]
    Model {
        t: f64,
        #[source]
        source: ModelError,
    },
    #[error("implicit solve failed in stage {stage}")]
    ImplicitStage {
        stage: usize,
        #[source]
        source: ImplicitSolveErrors,
    },
}

/// A Runge-Kutta stepper: tableau, scheme, optional tolerance and the stage buffers.
///
/// Stage buffers are allocated once in [`Method::new`] with the shape of the state given
/// there, and every call to [`Method::step`] reuses them.
#[derive(Debug)]
pub struct Method<State, const STAGES: usize> {
    tableau: Arc<ButcherTableau<STAGES>>,
    scheme: Scheme<State>,
    tol: Option<Tolerance>,
    buffers: StageBuffer<State, STAGES>,
    evaluations: usize,
}

impl<State: Integrable, const STAGES: usize> Method<State, STAGES> {
    /// Validates the algorithm and allocates stage buffers shaped like `shadow`.
    pub fn new(algorithm: Algorithm<State, STAGES>, shadow: &State) -> Result<Self, MethodErrors> {
        let Algorithm {
            tableau,
            scheme,
            tol,
        } = algorithm;
        tableau.validate()?;

        let needs_explicit = matches!(scheme, Scheme::Explicit | Scheme::Lawson(_));
        if needs_explicit && !tableau.is_explicit() {
            return Err(MethodErrors::IncompatibleTableau {
                scheme: scheme.name(),
                kind: tableau.kind(),
                label: tableau.label().to_string(),
            });
        }

        let tol = match tol {
            Some(_) if !tableau.is_embedded() => {
                return Err(MethodErrors::ToleranceWithoutEmbeddedPair(
                    tableau.label().to_string(),
                ));
            }
            Some(tol) => Some(Tolerance::new(tol).ok_or(MethodErrors::InvalidTolerance(tol))?),
            None => None,
        };

        Ok(Self {
            buffers: StageBuffer::new(shadow),
            tableau,
            scheme,
            tol,
            evaluations: 0,
        })
    }

    /// One attempt from `(tn, un)` with step `dt`.
    ///
    /// Without a tolerance this is a plain step: `(tn + dt, u_primary, dt)`. With one, the
    /// embedded error `err` decides: `err <= tol` is accepted and returns `(tn, un, dt_new)`,
    /// otherwise the attempt is rejected and returns `(tn + dt, u_primary, dt_new)`. Either
    /// way the primary solution of the attempt stays available from [`Method::candidate`].
    pub fn step<Model: OdeModel<State>>(
        &mut self,
        model: &mut Model,
        tn: f64,
        un: &State,
        dt: f64,
    ) -> Result<StepResult<State>, StepErrors> {
        self.evaluate_stages(model, tn, un, dt)?;

        let estimate = self.tol.is_some();
        match &mut self.scheme {
            Scheme::Lawson(exponential) => {
                self.buffers
                    .combine_lawson(&self.tableau, un, dt, estimate, exponential.as_mut())
            }
            _ => self.buffers.combine(&self.tableau, un, dt, estimate),
        }

        let Some(tol) = self.tol else {
            return Ok(StepResult {
                t: tn + dt,
                u: self.buffers.primary.clone(),
                dt,
                status: StepStatus::Fixed,
                error: None,
            });
        };

        let error = un.error_norm(&self.buffers.primary, &self.buffers.secondary);
        let dt_new = next_step_size(dt, error, tol.value(), self.tableau.order());

        if tol.accepts(error) {
            Ok(StepResult {
                t: tn,
                u: un.clone(),
                dt: dt_new,
                status: StepStatus::Accepted,
                error: Some(error),
            })
        } else {
            Ok(StepResult {
                t: tn + dt,
                u: self.buffers.primary.clone(),
                dt: dt_new,
                status: StepStatus::Rejected,
                error: Some(error),
            })
        }
    }

    fn evaluate_stages<Model: OdeModel<State>>(
        &mut self,
        model: &mut Model,
        tn: f64,
        un: &State,
        dt: f64,
    ) -> Result<(), StepErrors> {
        for index in 0..STAGES {
            let stage = Stage {
                tableau: &self.tableau,
                index,
                tn,
                un,
                dt,
            };
            self.evaluations += match &mut self.scheme {
                Scheme::Explicit => self.buffers.explicit_stage(&stage, model)?,
                Scheme::DiagonallyImplicit { solver, guess } => {
                    self.buffers
                        .implicit_stage(&stage, model, solver.as_mut(), *guess)?
                }
                Scheme::Lawson(exponential) => {
                    self.buffers
                        .lawson_stage(&stage, model, exponential.as_mut())?
                }
            };
        }
        Ok(())
    }

    /// Primary solution of the last attempt.
    pub fn candidate(&self) -> &State {
        &self.buffers.primary
    }

    /// Secondary (embedded) solution of the last attempt, if one was computed.
    pub fn secondary(&self) -> Option<&State> {
        self.tol.map(|_| &self.buffers.secondary)
    }

    /// Total right-hand-side evaluations since construction.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn tableau(&self) -> &ButcherTableau<STAGES> {
        &self.tableau
    }

    pub fn tolerance(&self) -> Option<Tolerance> {
        self.tol
    }

    /// Order of the primary weights.
    pub fn order(&self) -> usize {
        self.tableau.order()
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            has_embedded_error_estimate: self.tol.is_some(),
            requires_implicit_solve: matches!(self.scheme, Scheme::DiagonallyImplicit { .. })
                && self.tableau.is_diagonally_implicit(),
            requires_linear_operator: matches!(self.scheme, Scheme::Lawson(_)),
        }
    }
}
