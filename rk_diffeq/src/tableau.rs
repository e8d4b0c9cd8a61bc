use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sums of b and b2 must be within this distance of one.
const WEIGHT_SUM_TOL: f64 = 1e-10;

#[derive(Debug, Error)]
pub enum TableauErrors {
    #[error("tableau '{label}' has {found} rows in A, expected {expected}")]
    StageCount {
        label: String,
        expected: usize,
        found: usize,
    },
    #[error("tableau '{label}': row {row} of A has {found} entries, expected {expected}")]
    RowLength {
        label: String,
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("tableau '{label}': {name} has {found} entries, expected {expected}")]
    WeightsLength {
        label: String,
        name: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("embedded tableau '{0}' is missing its secondary weights b2")]
    MissingEmbeddedWeights(String),
    #[error("tableau '{label}': {name} sums to {sum}, expected 1")]
    WeightSum {
        label: String,
        name: &'static str,
        sum: f64,
    },
    #[error("tableau '{0}': order must be at least 1")]
    InvalidOrder(String),
    #[error("tableau '{label}': {name} contains a non-finite coefficient")]
    NonFinite { label: String, name: &'static str },
    #[error("tableau '{label}': A[{row}][{col}] = {value} is not allowed in a {kind:?} tableau")]
    Structure {
        label: String,
        row: usize,
        col: usize,
        value: f64,
        kind: TableauKind,
    },
    #[error("failed to parse tableau: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Shape of the A matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableauKind {
    /// Strictly lower triangular A.
    #[default]
    Explicit,
    /// Lower triangular A, the diagonal may be non-zero.
    DiagonallyImplicit,
}

/// Coefficients (A, b, b2, c) and order of one Runge-Kutta method.
///
/// Fields are private and only set at construction, so a tableau shared between steppers
/// can't change underneath them. Named methods are associated constants, e.g.
/// `ButcherTableau::<4>::RK4`.
#[derive(Clone, Debug, PartialEq)]
pub struct ButcherTableau<const STAGES: usize> {
    label: Cow<'static, str>,
    a: [[f64; STAGES]; STAGES],
    b: [f64; STAGES],
    b2: Option<[f64; STAGES]>,
    c: [f64; STAGES],
    order: usize,
    kind: TableauKind,
}

impl<const STAGES: usize> ButcherTableau<STAGES> {
    /// Builds and validates a tableau.
    pub fn new(
        label: impl Into<Cow<'static, str>>,
        a: [[f64; STAGES]; STAGES],
        b: [f64; STAGES],
        b2: Option<[f64; STAGES]>,
        c: [f64; STAGES],
        order: usize,
        kind: TableauKind,
    ) -> Result<Self, TableauErrors> {
        let tableau = Self {
            label: label.into(),
            a,
            b,
            b2,
            c,
            order,
            kind,
        };
        tableau.validate()?;
        Ok(tableau)
    }

    /// Parses a [`TableauSpec`] written in RON and converts it.
    pub fn from_ron(text: &str) -> Result<Self, TableauErrors> {
        let spec: TableauSpec = ron::from_str(text)?;
        Self::try_from(spec)
    }

    /// Checks order, finiteness, weight sums and the shape of A.
    pub fn validate(&self) -> Result<(), TableauErrors> {
        let label = || self.label.to_string();

        if self.order == 0 {
            return Err(TableauErrors::InvalidOrder(label()));
        }

        let finite = |values: &[f64]| values.iter().all(|v| v.is_finite());
        if !self.a.iter().all(|row| finite(row)) {
            return Err(TableauErrors::NonFinite { label: label(), name: "A" });
        }
        if !finite(&self.b) {
            return Err(TableauErrors::NonFinite { label: label(), name: "b" });
        }
        if !finite(&self.c) {
            return Err(TableauErrors::NonFinite { label: label(), name: "c" });
        }

        let sum: f64 = self.b.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOL {
            return Err(TableauErrors::WeightSum { label: label(), name: "b", sum });
        }
        if let Some(b2) = &self.b2 {
            if !finite(b2) {
                return Err(TableauErrors::NonFinite { label: label(), name: "b2" });
            }
            let sum: f64 = b2.iter().sum();
            if (sum - 1.0).abs() > WEIGHT_SUM_TOL {
                return Err(TableauErrors::WeightSum { label: label(), name: "b2", sum });
            }
        }

        for (row, values) in self.a.iter().enumerate() {
            for (col, &value) in values.iter().enumerate() {
                let allowed = match self.kind {
                    TableauKind::Explicit => col < row,
                    TableauKind::DiagonallyImplicit => col <= row,
                };
                if !allowed && value != 0.0 {
                    return Err(TableauErrors::Structure {
                        label: label(),
                        row,
                        col,
                        value,
                        kind: self.kind,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn a(&self) -> &[[f64; STAGES]; STAGES] {
        &self.a
    }

    pub fn b(&self) -> &[f64; STAGES] {
        &self.b
    }

    pub fn b2(&self) -> Option<&[f64; STAGES]> {
        self.b2.as_ref()
    }

    pub fn c(&self) -> &[f64; STAGES] {
        &self.c
    }

    /// Order of the primary weights b.
    pub fn order(&self) -> usize {
        self.order
    }

    pub fn stages(&self) -> usize {
        STAGES
    }

    pub fn kind(&self) -> TableauKind {
        self.kind
    }

    pub fn is_embedded(&self) -> bool {
        self.b2.is_some()
    }

    /// True when no stage depends on itself, whatever `kind` says.
    pub fn is_explicit(&self) -> bool {
        (0..STAGES).all(|i| self.a[i][i..].iter().all(|&v| v == 0.0))
    }

    pub fn is_diagonally_implicit(&self) -> bool {
        !self.is_explicit()
    }
}

/// Dynamically sized description of a tableau, as read from a data file.
///
/// ```text
/// (
///     label: "Ralston",
///     order: 2,
///     a: [[0.0, 0.0], [0.6666666666666666, 0.0]],
///     b: [0.25, 0.75],
///     c: [0.0, 0.6666666666666666],
/// )
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableauSpec {
    pub label: String,
    pub order: usize,
    #[serde(default)]
    pub kind: TableauKind,
    /// Set when the method is meant to carry an error estimate; then `b2` is required.
    #[serde(default)]
    pub embedded: bool,
    pub a: Vec<Vec<f64>>,
    pub b: Vec<f64>,
    #[serde(default)]
    pub b2: Option<Vec<f64>>,
    pub c: Vec<f64>,
}

impl<const STAGES: usize> TryFrom<TableauSpec> for ButcherTableau<STAGES> {
    type Error = TableauErrors;

    fn try_from(spec: TableauSpec) -> Result<Self, Self::Error> {
        let TableauSpec {
            label,
            order,
            kind,
            embedded,
            a,
            b,
            b2,
            c,
        } = spec;

        if a.len() != STAGES {
            return Err(TableauErrors::StageCount {
                label,
                expected: STAGES,
                found: a.len(),
            });
        }
        let mut rows = [[0.0; STAGES]; STAGES];
        for (row, values) in a.iter().enumerate() {
            if values.len() != STAGES {
                return Err(TableauErrors::RowLength {
                    label,
                    row,
                    expected: STAGES,
                    found: values.len(),
                });
            }
            rows[row].copy_from_slice(values);
        }

        let b = to_array(&label, "b", b)?;
        let c = to_array(&label, "c", c)?;
        let b2 = match b2 {
            Some(b2) => Some(to_array(&label, "b2", b2)?),
            None if embedded => return Err(TableauErrors::MissingEmbeddedWeights(label)),
            None => None,
        };

        Self::new(label, rows, b, b2, c, order, kind)
    }
}

fn to_array<const STAGES: usize>(
    label: &str,
    name: &'static str,
    values: Vec<f64>,
) -> Result<[f64; STAGES], TableauErrors> {
    let found = values.len();
    values.try_into().map_err(|_| TableauErrors::WeightsLength {
        label: label.to_string(),
        name,
        expected: STAGES,
        found,
    })
}

/// gamma = 1 - 1/sqrt(2) for the L-stable two stage SDIRK
const SDIRK2_GAMMA: f64 = 1.0 - std::f64::consts::FRAC_1_SQRT_2;

impl ButcherTableau<1> {
    // usage is ButcherTableau::<1>::EULER
    pub const EULER: Self = Self {
        label: Cow::Borrowed("Forward Euler"),
        a: [[0.]],
        b: [1.],
        b2: None,
        c: [0.],
        order: 1,
        kind: TableauKind::Explicit,
    };

    pub const BACKWARD_EULER: Self = Self {
        label: Cow::Borrowed("Backward Euler"),
        a: [[1.]],
        b: [1.],
        b2: None,
        c: [1.],
        order: 1,
        kind: TableauKind::DiagonallyImplicit,
    };

    pub const IMPLICIT_MIDPOINT: Self = Self {
        label: Cow::Borrowed("Implicit midpoint"),
        a: [[1. / 2.]],
        b: [1.],
        b2: None,
        c: [1. / 2.],
        order: 2,
        kind: TableauKind::DiagonallyImplicit,
    };
}

impl ButcherTableau<2> {
    pub const HEUN: Self = Self {
        label: Cow::Borrowed("Heun"),
        a: [[0., 0.], [1., 0.]],
        b: [1. / 2., 1. / 2.],
        b2: None,
        c: [0., 1.],
        order: 2,
        kind: TableauKind::Explicit,
    };

    /// Heun 2 with Euler embedded.
    pub const HEUN_EULER: Self = Self {
        label: Cow::Borrowed("Heun-Euler 2(1)"),
        a: [[0., 0.], [1., 0.]],
        b: [1. / 2., 1. / 2.],
        b2: Some([1., 0.]),
        c: [0., 1.],
        order: 2,
        kind: TableauKind::Explicit,
    };

    /// Alexander's L-stable SDIRK, order 2.
    pub const SDIRK2: Self = Self {
        label: Cow::Borrowed("SDIRK2"),
        a: [[SDIRK2_GAMMA, 0.], [1. - SDIRK2_GAMMA, SDIRK2_GAMMA]],
        b: [1. - SDIRK2_GAMMA, SDIRK2_GAMMA],
        b2: None,
        c: [SDIRK2_GAMMA, 1.],
        order: 2,
        kind: TableauKind::DiagonallyImplicit,
    };

    /// Trapezoidal rule written as an ESDIRK (explicit first stage).
    pub const CRANK_NICOLSON: Self = Self {
        label: Cow::Borrowed("Crank-Nicolson"),
        a: [[0., 0.], [1. / 2., 1. / 2.]],
        b: [1. / 2., 1. / 2.],
        b2: None,
        c: [0., 1.],
        order: 2,
        kind: TableauKind::DiagonallyImplicit,
    };
}

impl ButcherTableau<3> {
    /// Kutta's third order method.
    pub const RK33: Self = Self {
        label: Cow::Borrowed("RK3 (Kutta)"),
        a: [[0., 0., 0.], [1. / 2., 0., 0.], [-1., 2., 0.]],
        b: [1. / 6., 2. / 3., 1. / 6.],
        b2: None,
        c: [0., 1. / 2., 1.],
        order: 3,
        kind: TableauKind::Explicit,
    };
}

impl ButcherTableau<4> {
    // usage is ButcherTableau::<4>::RK4
    pub const RK4: Self = Self {
        label: Cow::Borrowed("RK4"),
        a: [
            [0., 0., 0., 0.],
            [1. / 2., 0., 0., 0.],
            [0., 1. / 2., 0., 0.],
            [0., 0., 1., 0.],
        ],
        b: [1. / 6., 1. / 3., 1. / 3., 1. / 6.],
        b2: None,
        c: [0., 1.0 / 2.0, 1.0 / 2.0, 1.0],
        order: 4,
        kind: TableauKind::Explicit,
    };

    /// Bogacki-Shampine 3(2). The fourth stage is the first-same-as-last stage, it is
    /// evaluated every step here.
    pub const BOGACKI_SHAMPINE: Self = Self {
        label: Cow::Borrowed("Bogacki-Shampine 3(2)"),
        a: [
            [0., 0., 0., 0.],
            [1. / 2., 0., 0., 0.],
            [0., 3. / 4., 0., 0.],
            [2. / 9., 1. / 3., 4. / 9., 0.],
        ],
        b: [2. / 9., 1. / 3., 4. / 9., 0.],
        b2: Some([7. / 24., 1. / 4., 1. / 3., 1. / 8.]),
        c: [0., 1. / 2., 3. / 4., 1.],
        order: 3,
        kind: TableauKind::Explicit,
    };
}

impl ButcherTableau<7> {
    // usage is ButcherTableau::<7>::DORMAND_PRINCE
    pub const DORMAND_PRINCE: Self = Self {
        label: Cow::Borrowed("Dormand-Prince 5(4)"),
        a: [
            [0., 0., 0., 0., 0., 0., 0.],
            [1. / 5., 0., 0., 0., 0., 0., 0.],
            [3. / 40., 9. / 40., 0., 0., 0., 0., 0.],
            [44. / 45., -56. / 15., 32. / 9., 0., 0., 0., 0.],
            [
                19372. / 6561.,
                -25360. / 2187.,
                64448. / 6561.,
                -212. / 729.,
                0.,
                0.,
                0.,
            ],
            [
                9017. / 3168.,
                -355. / 33.,
                46732. / 5247.,
                49. / 176.,
                -5103. / 18656.,
                0.,
                0.,
            ],
            [
                35. / 384.,
                0.,
                500. / 1113.,
                125. / 192.,
                -2187. / 6784.,
                11. / 84.,
                0.,
            ],
        ],
        b: [
            35. / 384.,
            0.,
            500. / 1113.,
            125. / 192.,
            -2187. / 6784.,
            11. / 84.,
            0.,
        ],
        b2: Some([
            5179. / 57600.,
            0.,
            7571. / 16695.,
            393. / 640.,
            -92097. / 339200.,
            187. / 2100.,
            1. / 40.,
        ]),
        c: [0., 1. / 5., 3. / 10., 4. / 5., 8. / 9., 1.0, 1.0],
        order: 5,
        kind: TableauKind::Explicit,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_weights_sum_to_one<const S: usize>(tableau: &ButcherTableau<S>) {
        assert_abs_diff_eq!(tableau.b().iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        if let Some(b2) = tableau.b2() {
            assert_abs_diff_eq!(b2.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        }
    }

    fn assert_row_sums_match_c<const S: usize>(tableau: &ButcherTableau<S>) {
        for i in 0..S {
            assert_abs_diff_eq!(tableau.a()[i].iter().sum::<f64>(), tableau.c()[i], epsilon = 1e-12);
        }
    }

    macro_rules! check_named {
        ($($tableau:expr),+ $(,)?) => {
            $(
                let tableau = $tableau;
                tableau.validate().unwrap();
                assert_weights_sum_to_one(&tableau);
                assert_row_sums_match_c(&tableau);
            )+
        };
    }

    #[test]
    fn named_tableaux_are_valid() {
        check_named!(
            ButcherTableau::<1>::EULER,
            ButcherTableau::<1>::BACKWARD_EULER,
            ButcherTableau::<1>::IMPLICIT_MIDPOINT,
            ButcherTableau::<2>::HEUN,
            ButcherTableau::<2>::HEUN_EULER,
            ButcherTableau::<2>::SDIRK2,
            ButcherTableau::<2>::CRANK_NICOLSON,
            ButcherTableau::<3>::RK33,
            ButcherTableau::<4>::RK4,
            ButcherTableau::<4>::BOGACKI_SHAMPINE,
            ButcherTableau::<7>::DORMAND_PRINCE,
        );
    }

    #[test]
    fn explicit_and_implicit_shapes() {
        assert!(ButcherTableau::<4>::RK4.is_explicit());
        assert!(!ButcherTableau::<4>::RK4.is_embedded());
        assert!(ButcherTableau::<4>::BOGACKI_SHAMPINE.is_embedded());
        assert!(ButcherTableau::<2>::SDIRK2.is_diagonally_implicit());
        assert!(ButcherTableau::<1>::BACKWARD_EULER.is_diagonally_implicit());
        assert_eq!(ButcherTableau::<7>::DORMAND_PRINCE.stages(), 7);
        assert_eq!(ButcherTableau::<7>::DORMAND_PRINCE.order(), 5);
    }

    #[test]
    fn loads_ralston_from_ron() {
        let tableau = ButcherTableau::<2>::from_ron(
            r#"(
                label: "Ralston",
                order: 2,
                a: [[0.0, 0.0], [0.6666666666666666, 0.0]],
                b: [0.25, 0.75],
                c: [0.0, 0.6666666666666666],
            )"#,
        )
        .unwrap();
        assert_eq!(tableau.label(), "Ralston");
        assert_eq!(tableau.kind(), TableauKind::Explicit);
        assert!(!tableau.is_embedded());
        assert_eq!(tableau.b(), &[0.25, 0.75]);
    }

    #[test]
    fn loads_embedded_pair_from_ron() {
        let tableau = ButcherTableau::<2>::from_ron(
            r#"(
                label: "Heun-Euler",
                order: 2,
                embedded: true,
                a: [[0.0, 0.0], [1.0, 0.0]],
                b: [0.5, 0.5],
                b2: Some([1.0, 0.0]),
                c: [0.0, 1.0],
            )"#,
        )
        .unwrap();
        assert_eq!(tableau.b2(), ButcherTableau::<2>::HEUN_EULER.b2());
    }

    fn spec() -> TableauSpec {
        TableauSpec {
            label: "test".into(),
            order: 2,
            kind: TableauKind::Explicit,
            embedded: false,
            a: vec![vec![0.0, 0.0], vec![1.0, 0.0]],
            b: vec![0.5, 0.5],
            b2: None,
            c: vec![0.0, 1.0],
        }
    }

    #[test]
    fn rejects_wrong_stage_count() {
        let err = ButcherTableau::<3>::try_from(spec()).unwrap_err();
        assert!(matches!(err, TableauErrors::StageCount { expected: 3, found: 2, .. }));
    }

    #[test]
    fn rejects_ragged_rows() {
        let mut spec = spec();
        spec.a[1] = vec![1.0];
        let err = ButcherTableau::<2>::try_from(spec).unwrap_err();
        assert!(matches!(err, TableauErrors::RowLength { row: 1, found: 1, .. }));
    }

    #[test]
    fn rejects_short_weights() {
        let mut spec = spec();
        spec.b = vec![1.0];
        let err = ButcherTableau::<2>::try_from(spec).unwrap_err();
        assert!(matches!(err, TableauErrors::WeightsLength { name: "b", .. }));

        let mut spec = self::spec();
        spec.b2 = Some(vec![1.0, 0.0, 0.0]);
        let err = ButcherTableau::<2>::try_from(spec).unwrap_err();
        assert!(matches!(err, TableauErrors::WeightsLength { name: "b2", found: 3, .. }));
    }

    #[test]
    fn rejects_embedded_without_b2() {
        let mut spec = spec();
        spec.embedded = true;
        let err = ButcherTableau::<2>::try_from(spec).unwrap_err();
        assert!(matches!(err, TableauErrors::MissingEmbeddedWeights(_)));
    }

    #[test]
    fn rejects_bad_weight_sums() {
        let mut spec = spec();
        spec.b = vec![0.5, 0.6];
        let err = ButcherTableau::<2>::try_from(spec).unwrap_err();
        assert!(matches!(err, TableauErrors::WeightSum { name: "b", .. }));

        let mut spec = self::spec();
        spec.b2 = Some(vec![0.9, 0.0]);
        let err = ButcherTableau::<2>::try_from(spec).unwrap_err();
        assert!(matches!(err, TableauErrors::WeightSum { name: "b2", .. }));
    }

    #[test]
    fn rejects_diagonal_in_explicit_tableau() {
        let mut spec = spec();
        spec.a[1][1] = 0.5;
        let err = ButcherTableau::<2>::try_from(spec.clone()).unwrap_err();
        assert!(matches!(err, TableauErrors::Structure { row: 1, col: 1, .. }));

        spec.kind = TableauKind::DiagonallyImplicit;
        assert!(ButcherTableau::<2>::try_from(spec).is_ok());
    }

    #[test]
    fn rejects_upper_triangle_in_dirk() {
        let mut spec = spec();
        spec.kind = TableauKind::DiagonallyImplicit;
        spec.a[0][1] = 0.25;
        let err = ButcherTableau::<2>::try_from(spec).unwrap_err();
        assert!(matches!(err, TableauErrors::Structure { row: 0, col: 1, .. }));
    }

    #[test]
    fn rejects_zero_order_and_nan() {
        let mut spec = spec();
        spec.order = 0;
        assert!(matches!(
            ButcherTableau::<2>::try_from(spec).unwrap_err(),
            TableauErrors::InvalidOrder(_)
        ));

        let mut spec = self::spec();
        spec.c[1] = f64::NAN;
        assert!(matches!(
            ButcherTableau::<2>::try_from(spec).unwrap_err(),
            TableauErrors::NonFinite { name: "c", .. }
        ));
    }

    #[test]
    fn reports_parse_errors() {
        let err = ButcherTableau::<2>::from_ron("(label: 3)").unwrap_err();
        assert!(matches!(err, TableauErrors::Parse(_)));
    }
}
