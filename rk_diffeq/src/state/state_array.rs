use std::ops::{AddAssign, Deref, DerefMut, MulAssign};

use tolerance::ErrorNorm;

use super::Integrable;

/// A fixed-size array wrapper representing a generic state vector with `N` f64 components.
///
/// This type is commonly used as a concrete state for ODE solvers; it lives on the stack,
/// so stepping with it never allocates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StateArray<const N: usize>([f64; N]);

impl<const N: usize> StateArray<N> {
    /// Constructs a new `StateArray` from an array of `f64`.
    pub fn new(array: [f64; N]) -> Self {
        Self(array)
    }

    /// Returns the underlying array.
    pub fn into_inner(self) -> [f64; N] {
        self.0
    }
}

impl<const N: usize> Default for StateArray<N> {
    /// Creates a `StateArray` with all elements initialized to zero.
    fn default() -> Self {
        Self([0.0; N])
    }
}

impl<const N: usize> From<[f64; N]> for StateArray<N> {
    fn from(array: [f64; N]) -> Self {
        Self(array)
    }
}

impl<const N: usize> AddAssign<&Self> for StateArray<N> {
    /// Adds each element from the right-hand side into `self` in-place.
    fn add_assign(&mut self, rhs: &Self) {
        for (x, r) in self.0.iter_mut().zip(rhs.0.iter()) {
            *x += r;
        }
    }
}

impl<const N: usize> MulAssign<f64> for StateArray<N> {
    /// Multiplies each element of the array in-place by the given scalar.
    fn mul_assign(&mut self, rhs: f64) {
        for x in self.0.iter_mut() {
            *x *= rhs;
        }
    }
}

impl<const N: usize> ErrorNorm for StateArray<N> {
    fn error_norm(&self, u1: &Self, u2: &Self) -> f64 {
        self.0.error_norm(&u1.0, &u2.0)
    }
}

impl<const N: usize> Integrable for StateArray<N> {
    fn set_zero(&mut self) {
        self.0 = [0.0; N];
    }

    fn components(&self) -> &[f64] {
        &self.0
    }
}

impl<const N: usize> Deref for StateArray<N> {
    type Target = [f64; N];

    /// Dereferences the `StateArray` to access the underlying array.
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const N: usize> DerefMut for StateArray<N> {
    /// Mutable dereference to the underlying array.
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
