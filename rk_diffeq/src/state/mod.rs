//! State containers that the steppers can integrate.
//!
//! A state is a scalar or an ordered sequence of `f64` components. The
//! steppers only need in-place scaling and accumulation plus the scaled error
//! norm, so user types can join by implementing [`Integrable`].

use std::{
    fmt::Debug,
    ops::{AddAssign, MulAssign},
};

use tolerance::ErrorNorm;

pub mod state_array;
pub mod state_vector;

/// Trait representing an integrable state for use in ODE solvers.
///
/// The derivative of a state has the same type as the state itself. Stage
/// buffers are created once from a "shadow" state with [`Integrable::zeros_like`]
/// and then overwritten in place every step.
pub trait Integrable:
    Clone + Debug + ErrorNorm + MulAssign<f64> + for<'a> AddAssign<&'a Self>
{
    /// Sets every component to zero, keeping the shape.
    fn set_zero(&mut self);

    /// Components in order, used for output.
    fn components(&self) -> &[f64];

    /// Zero-valued state with the same shape as `self`.
    fn zeros_like(&self) -> Self {
        let mut zeros = self.clone();
        zeros.set_zero();
        zeros
    }
}

impl Integrable for f64 {
    fn set_zero(&mut self) {
        *self = 0.0;
    }

    fn components(&self) -> &[f64] {
        std::slice::from_ref(self)
    }
}
