//! Regression families and their hyperparameter grids.

use std::fmt;

/// Degree of the local polynomial fitted by the local-regression family.
pub const LOCAL_DEGREE: usize = 2;

/// A regression modeling approach with its own hyperparameter space.
///
/// The declaration order is the enumeration order used everywhere a tie has
/// to be broken between families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Family {
    Linear,
    Polynomial,
    Step,
    NaturalSpline,
    SmoothingSpline,
    Local,
}

/// How the candidates of a family are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scoring {
    /// No hyperparameter; the family is fitted once.
    Single,
    /// Mean RMSE over k held-out folds.
    CrossValidated,
    /// RMSE of the fit on the data it was fitted to.
    InSample,
}

/// One value from a family's hyperparameter grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hyperparameter {
    Degree(usize),
    Breaks(usize),
    DegreesOfFreedom(usize),
    Span(f64),
}

impl Family {
    pub const ALL: [Family; 6] = [
        Family::Linear,
        Family::Polynomial,
        Family::Step,
        Family::NaturalSpline,
        Family::SmoothingSpline,
        Family::Local,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Family::Linear => "linear",
            Family::Polynomial => "polynomial",
            Family::Step => "step",
            Family::NaturalSpline => "natural-spline",
            Family::SmoothingSpline => "smoothing-spline",
            Family::Local => "local",
        }
    }

    pub fn scoring(self) -> Scoring {
        match self {
            Family::Linear | Family::SmoothingSpline => Scoring::Single,
            Family::Polynomial | Family::Step | Family::NaturalSpline => Scoring::CrossValidated,
            Family::Local => Scoring::InSample,
        }
    }

    /// The fixed candidate grid, in the order ties are resolved (first wins).
    /// Empty for hyperparameter-free families.
    pub fn candidates(self) -> Vec<Hyperparameter> {
        match self {
            Family::Linear | Family::SmoothingSpline => Vec::new(),
            Family::Polynomial => (1..=4).map(Hyperparameter::Degree).collect(),
            Family::Step => (4..=7).map(Hyperparameter::Breaks).collect(),
            Family::NaturalSpline => (3..=10).map(Hyperparameter::DegreesOfFreedom).collect(),
            Family::Local => (1..=10)
                .map(|i| Hyperparameter::Span(i as f64 / 10.0))
                .collect(),
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Hyperparameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hyperparameter::Degree(d) => write!(f, "degree={d}"),
            Hyperparameter::Breaks(b) => write!(f, "breaks={b}"),
            Hyperparameter::DegreesOfFreedom(df) => write!(f, "df={df}"),
            Hyperparameter::Span(span) => write!(f, "span={span:.1}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grids_match_documented_values() {
        assert!(Family::Linear.candidates().is_empty());
        assert!(Family::SmoothingSpline.candidates().is_empty());
        assert_eq!(
            Family::Polynomial.candidates(),
            vec![
                Hyperparameter::Degree(1),
                Hyperparameter::Degree(2),
                Hyperparameter::Degree(3),
                Hyperparameter::Degree(4)
            ]
        );
        assert_eq!(Family::Step.candidates().len(), 4);
        assert_eq!(Family::NaturalSpline.candidates().len(), 8);
        assert_eq!(
            Family::NaturalSpline.candidates().last(),
            Some(&Hyperparameter::DegreesOfFreedom(10))
        );

        let spans = Family::Local.candidates();
        assert_eq!(spans.len(), 10);
        assert_eq!(spans[0], Hyperparameter::Span(0.1));
        assert_eq!(spans[9], Hyperparameter::Span(1.0));
    }

    #[test]
    fn enumeration_order_is_declaration_order() {
        let mut sorted = Family::ALL;
        sorted.sort();
        assert_eq!(sorted, Family::ALL);
        assert_eq!(Family::Local.scoring(), Scoring::InSample);
        assert_eq!(Family::Step.scoring(), Scoring::CrossValidated);
    }

    #[test]
    fn display_is_stable() {
        assert_eq!(Family::NaturalSpline.to_string(), "natural-spline");
        assert_eq!(Hyperparameter::Span(0.3).to_string(), "span=0.3");
        assert_eq!(Hyperparameter::Breaks(5).to_string(), "breaks=5");
    }
}
