use std::ops::{AddAssign, Deref, DerefMut, MulAssign};

use tolerance::ErrorNorm;

use super::Integrable;

/// A dynamic-sized vector type for use in ODE solvers.
///
/// Unlike `StateArray`, this type stores its data in a `Vec<f64>` whose length is fixed when
/// it is built. Stage buffers created from it are allocated once and then reused, since every
/// in-place operation keeps the length.
#[derive(Debug, Default, PartialEq)]
pub struct StateVector {
    /// Internal storage for the vector values.
    value: Vec<f64>,
}

impl StateVector {
    /// Constructs a new `StateVector` from a `Vec<f64>`.
    pub fn new(value: Vec<f64>) -> Self {
        Self { value }
    }

    /// Constructs a zero vector with `n` components.
    pub fn zeros(n: usize) -> Self {
        Self { value: vec![0.0; n] }
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.value
    }
}

impl Clone for StateVector {
    fn clone(&self) -> Self {
        Self { value: self.value.clone() }
    }

    // derived Clone would reallocate here
    fn clone_from(&mut self, source: &Self) {
        self.value.clone_from(&source.value);
    }
}

impl From<Vec<f64>> for StateVector {
    fn from(value: Vec<f64>) -> Self {
        Self::new(value)
    }
}

impl AddAssign<&Self> for StateVector {
    /// Performs element-wise addition of two `StateVector`s.
    ///
    /// # Panics
    ///
    /// Panics if the vectors have different lengths.
    fn add_assign(&mut self, rhs: &Self) {
        if self.value.len() != rhs.value.len() {
            panic!("state vectors do not have same length")
        }
        for (x, r) in self.value.iter_mut().zip(rhs.value.iter()) {
            *x += r;
        }
    }
}

impl MulAssign<f64> for StateVector {
    /// Multiplies each element in the vector by a scalar value.
    fn mul_assign(&mut self, rhs: f64) {
        for x in self.value.iter_mut() {
            *x *= rhs;
        }
    }
}

impl ErrorNorm for StateVector {
    fn error_norm(&self, u1: &Self, u2: &Self) -> f64 {
        self.value.error_norm(&u1.value, &u2.value)
    }
}

impl Integrable for StateVector {
    fn set_zero(&mut self) {
        self.value.fill(0.0);
    }

    fn components(&self) -> &[f64] {
        &self.value
    }
}

impl Deref for StateVector {
    type Target = [f64];

    /// Provides access to the underlying values (read-only).
    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl DerefMut for StateVector {
    /// Provides mutable access to the underlying values. The length cannot change through it.
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.value
    }
}
