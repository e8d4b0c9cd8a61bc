use std::sync::Arc;

use crate::{
    implicit::{ImplicitStageSolver, InitialGuess},
    lawson::ExponentialAction,
    tableau::ButcherTableau,
};

/// How the stages of a tableau are turned into derivatives.
pub enum Scheme<State> {
    /// Stage i only uses stages j < i.
    Explicit,
    /// Stage i solves for its own derivative with a nonlinear solver.
    DiagonallyImplicit {
        solver: Box<dyn ImplicitStageSolver<State>>,
        guess: InitialGuess,
    },
    /// Explicit tableau in the integrating-factor form of a split problem
    /// `u' = L u + N(t, u)`; the model evaluates `N`.
    Lawson(Box<dyn ExponentialAction<State>>),
}

impl<State> Scheme<State> {
    pub fn name(&self) -> &'static str {
        match self {
            Scheme::Explicit => "explicit",
            Scheme::DiagonallyImplicit { .. } => "diagonally implicit",
            Scheme::Lawson(_) => "Lawson",
        }
    }
}

impl<State> std::fmt::Debug for Scheme<State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scheme::DiagonallyImplicit { guess, .. } => f
                .debug_struct("DiagonallyImplicit")
                .field("guess", guess)
                .finish_non_exhaustive(),
            _ => f.write_str(self.name()),
        }
    }
}

/// What a configured method needs and provides.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub has_embedded_error_estimate: bool,
    pub requires_implicit_solve: bool,
    pub requires_linear_operator: bool,
}

/// A tableau, a scheme and an optional tolerance. Turned into a
/// [`Method`](crate::rk::Method) once the state shape is known.
#[derive(Debug)]
pub struct Algorithm<State, const STAGES: usize> {
    pub(crate) tableau: Arc<ButcherTableau<STAGES>>,
    pub(crate) scheme: Scheme<State>,
    pub(crate) tol: Option<f64>,
}

impl<State, const STAGES: usize> Algorithm<State, STAGES> {
    pub fn explicit(tableau: impl Into<Arc<ButcherTableau<STAGES>>>) -> Self {
        Self {
            tableau: tableau.into(),
            scheme: Scheme::Explicit,
            tol: None,
        }
    }

    pub fn diagonally_implicit(
        tableau: impl Into<Arc<ButcherTableau<STAGES>>>,
        solver: impl ImplicitStageSolver<State> + 'static,
    ) -> Self {
        Self {
            tableau: tableau.into(),
            scheme: Scheme::DiagonallyImplicit {
                solver: Box::new(solver),
                guess: InitialGuess::default(),
            },
            tol: None,
        }
    }

    pub fn lawson(
        tableau: impl Into<Arc<ButcherTableau<STAGES>>>,
        exponential: impl ExponentialAction<State> + 'static,
    ) -> Self {
        Self {
            tableau: tableau.into(),
            scheme: Scheme::Lawson(Box::new(exponential)),
            tol: None,
        }
    }

    /// Enables step-size control. Requires an embedded tableau.
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tol = Some(tol);
        self
    }

    /// Initial guess for implicit stages. Ignored by the other schemes.
    pub fn with_initial_guess(mut self, initial_guess: InitialGuess) -> Self {
        if let Scheme::DiagonallyImplicit { guess, .. } = &mut self.scheme {
            *guess = initial_guess;
        }
        self
    }

    pub fn tableau(&self) -> &ButcherTableau<STAGES> {
        &self.tableau
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            has_embedded_error_estimate: self.tol.is_some() && self.tableau.is_embedded(),
            requires_implicit_solve: matches!(self.scheme, Scheme::DiagonallyImplicit { .. })
                && self.tableau.is_diagonally_implicit(),
            requires_linear_operator: matches!(self.scheme, Scheme::Lawson(_)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::implicit::FixedPointIteration;

    #[test]
    fn capabilities_follow_scheme_and_tableau() {
        let rk4 = Algorithm::<f64, 4>::explicit(ButcherTableau::<4>::RK4);
        assert_eq!(rk4.capabilities(), Capabilities::default());

        let bs = Algorithm::<f64, 4>::explicit(ButcherTableau::<4>::BOGACKI_SHAMPINE);
        assert!(!bs.capabilities().has_embedded_error_estimate);
        let bs = bs.with_tolerance(1e-6);
        assert!(bs.capabilities().has_embedded_error_estimate);

        let sdirk =
            Algorithm::<f64, 2>::diagonally_implicit(ButcherTableau::<2>::SDIRK2, FixedPointIteration::default());
        assert!(sdirk.capabilities().requires_implicit_solve);

        let lawson = Algorithm::<f64, 4>::lawson(ButcherTableau::<4>::RK4, |theta: f64, u: &f64| {
            (-theta).exp() * u
        });
        assert!(lawson.capabilities().requires_linear_operator);
        assert!(!lawson.capabilities().requires_implicit_solve);
    }

    #[test]
    fn initial_guess_only_applies_to_implicit() {
        let sdirk = Algorithm::<f64, 2>::diagonally_implicit(
            ButcherTableau::<2>::SDIRK2,
            FixedPointIteration::default(),
        )
        .with_initial_guess(InitialGuess::PreviousStage);
        assert!(matches!(
            sdirk.scheme,
            Scheme::DiagonallyImplicit { guess: InitialGuess::PreviousStage, .. }
        ));

        let rk4 = Algorithm::<f64, 4>::explicit(ButcherTableau::<4>::RK4)
            .with_initial_guess(InitialGuess::PreviousStage);
        assert!(matches!(rk4.scheme, Scheme::Explicit));
    }
}
