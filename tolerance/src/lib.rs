//! Error measures used by embedded Runge-Kutta pairs.
//!
//! The norm compares two candidate solutions `u1` and `u2` of the same step,
//! scaled by the state at the start of the step:
//!
//! ```text
//! err = sqrt( sum_k ((u1_k - u2_k) / (1 + max(un_k, u1_k)))^2 )
//! ```
//!
//! The `1 +` keeps the scale away from zero near the origin while the norm
//! behaves like a relative error for large magnitudes.

/// Tolerance used to accept or reject an adaptive step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerance(f64);

impl Tolerance {
    /// Returns `None` unless `tol` is finite and strictly positive.
    pub fn new(tol: f64) -> Option<Self> {
        if tol.is_finite() && tol > 0.0 {
            Some(Self(tol))
        } else {
            None
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// A step is accepted when its error does not exceed the tolerance.
    pub fn accepts(&self, err: f64) -> bool {
        err <= self.0
    }
}

/// Single component of the norm, before squaring.
#[inline]
pub fn scaled_difference(un: f64, u1: f64, u2: f64) -> f64 {
    (u1 - u2) / (1.0 + un.max(u1))
}

/// Scaled distance between two estimates of the same step.
///
/// `self` is the state at the start of the step, `u1` the primary estimate
/// and `u2` the secondary (embedded) estimate.
pub trait ErrorNorm {
    fn error_norm(&self, u1: &Self, u2: &Self) -> f64;
}

impl ErrorNorm for f64 {
    fn error_norm(&self, u1: &Self, u2: &Self) -> f64 {
        scaled_difference(*self, *u1, *u2).abs()
    }
}

impl ErrorNorm for [f64] {
    fn error_norm(&self, u1: &Self, u2: &Self) -> f64 {
        debug_assert_eq!(self.len(), u1.len());
        debug_assert_eq!(self.len(), u2.len());
        let sum_squared_errors: f64 = self
            .iter()
            .zip(u1)
            .zip(u2)
            .map(|((un, u1), u2)| {
                let e = scaled_difference(*un, *u1, *u2);
                e * e
            })
            .sum();
        sum_squared_errors.sqrt()
    }
}

impl<const N: usize> ErrorNorm for [f64; N] {
    fn error_norm(&self, u1: &Self, u2: &Self) -> f64 {
        self.as_slice().error_norm(u1.as_slice(), u2.as_slice())
    }
}

impl ErrorNorm for Vec<f64> {
    fn error_norm(&self, u1: &Self, u2: &Self) -> f64 {
        self.as_slice().error_norm(u1.as_slice(), u2.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn identical_estimates_have_zero_error() {
        assert_eq!(3.0_f64.error_norm(&-2.5, &-2.5), 0.0);
        let un: [f64; 3] = [0.0, 1.0, -4.0];
        assert_eq!(un.error_norm(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 0.0);
        let un: Vec<f64> = vec![7.0; 4];
        assert_eq!(un.error_norm(&vec![0.1; 4], &vec![0.1; 4]), 0.0);
    }

    #[test]
    fn vector_norm_matches_hand_computation() {
        let un: [f64; 2] = [0.0, 0.0];
        let u1 = [1.0, 2.0];
        let u2 = [1.1, 1.9];
        // (1 - 1.1) / (1 + 1) and (2 - 1.9) / (1 + 2)
        let e0: f64 = (1.0 - 1.1) / 2.0;
        let e1: f64 = (2.0 - 1.9) / 3.0;
        let expected = (e0 * e0 + e1 * e1).sqrt();
        assert_eq!(un.error_norm(&u1, &u2), expected);
        assert_abs_diff_eq!(un.error_norm(&u1, &u2), 0.060092521257733, epsilon = 1e-14);
    }

    #[test]
    fn scalar_norm_is_absolute_scaled_difference() {
        assert_abs_diff_eq!(1.0_f64.error_norm(&2.0, &2.3), 0.1, epsilon = 1e-15);
        assert_abs_diff_eq!(0.0_f64.error_norm(&-0.5, &-0.4), 0.1, epsilon = 1e-15);
    }

    #[test]
    fn symmetric_when_start_state_dominates() {
        // max(un, u1) == max(un, u2) == un, so swapping the estimates only
        // flips the sign of each difference
        let un: [f64; 3] = [5.0, 10.0, 3.0];
        let u1 = [1.0, 2.0, -1.0];
        let u2 = [1.5, 1.0, 0.25];
        assert_eq!(un.error_norm(&u1, &u2), un.error_norm(&u2, &u1));
        assert_eq!(4.0_f64.error_norm(&1.0, &3.5), 4.0_f64.error_norm(&3.5, &1.0));
    }

    #[test]
    fn tolerance_rejects_invalid_values() {
        assert!(Tolerance::new(0.0).is_none());
        assert!(Tolerance::new(-1e-6).is_none());
        assert!(Tolerance::new(f64::NAN).is_none());
        assert!(Tolerance::new(f64::INFINITY).is_none());
        let tol = Tolerance::new(1e-6).unwrap();
        assert!(tol.accepts(1e-6));
        assert!(!tol.accepts(1.0000001e-6));
    }
}
