//! # Model Fitting
//!
//! Fits one regression family at one hyperparameter value and returns a
//! self-contained predictor. Basis families (linear, polynomial, step,
//! natural spline) are ordinary least squares over a design matrix from
//! [`crate::basis`]; the smoothing spline and local regression live in their
//! own modules because they carry an inner fitting loop.
//!
//! Least squares goes through an SVD so that rank-deficient designs (a step
//! interval with no training points, duplicate spline knots) still produce the
//! minimum-norm solution instead of an error.

use crate::basis::{
    self, BasisError, natural_spline_basis, natural_spline_knots, polynomial_basis, step_basis,
};
use crate::data::Observations;
use crate::family::{Family, Hyperparameter};
use crate::loess::LocalFit;
use crate::smoothing::SmoothingSplineFit;
use ndarray::{Array1, Array2, ArrayView1, array};
use ndarray_linalg::LeastSquaresSvd;
use thiserror::Error;

/// A comprehensive error type for fitting a single model.
#[derive(Error, Debug)]
pub enum FitError {
    #[error("Underlying basis function generation failed: {0}")]
    BasisError(#[from] BasisError),

    #[error("A linear algebra routine failed. The design may be numerically singular. Error: {0}")]
    LinalgError(#[from] ndarray_linalg::error::LinalgError),

    #[error("Cannot fit a model to an empty data set.")]
    EmptyData,

    #[error("Non-finite values (NaN or Infinity) were found in '{0}'.")]
    NonFinite(&'static str),

    #[error("The {family} family needs at least {needed} distinct budget values, but found {found}.")]
    TooFewDistinctValues {
        family: Family,
        needed: usize,
        found: usize,
    },

    #[error("Local regression span must be positive, but {0} was given.")]
    InvalidSpan(f64),

    #[error("No smoothing parameter on the search grid produced a finite GCV score.")]
    NoSmoothingParameter,

    #[error("Hyperparameter {hyperparameter:?} does not apply to the {family} family.")]
    HyperparameterMismatch {
        family: Family,
        hyperparameter: Option<Hyperparameter>,
    },
}

/// A fitted predictor `budget → predicted gross`.
///
/// Each variant stores the training-time range or knots, so predictions on new
/// budgets are expanded in the basis the coefficients were fitted in.
#[derive(Debug, Clone)]
pub enum FittedModel {
    /// Polynomial in the rescaled budget; degree 1 is the linear family.
    Polynomial {
        range: (f64, f64),
        degree: usize,
        coefficients: Array1<f64>,
    },
    Step {
        range: (f64, f64),
        breaks: usize,
        coefficients: Array1<f64>,
    },
    NaturalSpline {
        knots: Array1<f64>,
        coefficients: Array1<f64>,
    },
    SmoothingSpline(SmoothingSplineFit),
    Local(LocalFit),
}

impl FittedModel {
    /// Predicts gross for every budget in `budget`.
    pub fn predict_many(&self, budget: ArrayView1<f64>) -> Result<Array1<f64>, FitError> {
        match self {
            FittedModel::Polynomial {
                range,
                degree,
                coefficients,
            } => Ok(polynomial_basis(budget, *range, *degree)?.dot(coefficients)),
            FittedModel::Step {
                range,
                breaks,
                coefficients,
            } => Ok(step_basis(budget, *range, *breaks)?.dot(coefficients)),
            FittedModel::NaturalSpline {
                knots,
                coefficients,
            } => Ok(natural_spline_basis(budget, knots.view())?.dot(coefficients)),
            FittedModel::SmoothingSpline(fit) => Ok(fit.predict_many(budget)),
            FittedModel::Local(fit) => fit.predict_many(budget),
        }
    }

    /// Predicts gross for a single budget.
    pub fn predict(&self, budget: f64) -> Result<f64, FitError> {
        Ok(self.predict_many(array![budget].view())?[0])
    }
}

/// Fits `family` at `hyperparameter` (which must be `None` for hyperparameter-free
/// families) to the given observations.
pub fn fit(
    family: Family,
    hyperparameter: Option<Hyperparameter>,
    observations: &Observations,
) -> Result<FittedModel, FitError> {
    validate(observations)?;
    let x = observations.budget.view();
    let y = observations.gross.view();

    match (family, hyperparameter) {
        (Family::Linear, None) => fit_polynomial(x, y, 1),
        (Family::Polynomial, Some(Hyperparameter::Degree(degree))) => {
            fit_polynomial(x, y, degree)
        }
        (Family::Step, Some(Hyperparameter::Breaks(breaks))) => {
            let range = basis::data_range(x);
            let design = step_basis(x, range, breaks)?;
            Ok(FittedModel::Step {
                range,
                breaks,
                coefficients: least_squares(design, y)?,
            })
        }
        (Family::NaturalSpline, Some(Hyperparameter::DegreesOfFreedom(df))) => {
            let knots = natural_spline_knots(x, df)?;
            let design = natural_spline_basis(x, knots.view())?;
            Ok(FittedModel::NaturalSpline {
                knots,
                coefficients: least_squares(design, y)?,
            })
        }
        (Family::SmoothingSpline, None) => {
            Ok(FittedModel::SmoothingSpline(SmoothingSplineFit::fit(x, y)?))
        }
        (Family::Local, Some(Hyperparameter::Span(span))) => {
            Ok(FittedModel::Local(LocalFit::fit(x, y, span)?))
        }
        (family, hyperparameter) => Err(FitError::HyperparameterMismatch {
            family,
            hyperparameter,
        }),
    }
}

fn fit_polynomial(
    x: ArrayView1<f64>,
    y: ArrayView1<f64>,
    degree: usize,
) -> Result<FittedModel, FitError> {
    let range = basis::data_range(x);
    let design = polynomial_basis(x, range, degree)?;
    Ok(FittedModel::Polynomial {
        range,
        degree,
        coefficients: least_squares(design, y)?,
    })
}

fn validate(observations: &Observations) -> Result<(), FitError> {
    if observations.is_empty() {
        return Err(FitError::EmptyData);
    }
    if observations.budget.iter().any(|v| !v.is_finite()) {
        return Err(FitError::NonFinite("budget"));
    }
    if observations.gross.iter().any(|v| !v.is_finite()) {
        return Err(FitError::NonFinite("gross"));
    }
    Ok(())
}

/// Minimum-norm least-squares solution of `design · β ≈ y`.
pub(crate) fn least_squares(
    design: Array2<f64>,
    y: ArrayView1<f64>,
) -> Result<Array1<f64>, FitError> {
    let result = design.least_squares(&y.to_owned())?;
    if (result.rank as usize) < design.ncols() {
        log::debug!(
            "Design matrix is rank deficient ({} of {} columns); using the minimum-norm solution.",
            result.rank,
            design.ncols()
        );
    }
    if result.solution.iter().any(|v| !v.is_finite()) {
        return Err(FitError::NonFinite("coefficients"));
    }
    Ok(result.solution)
}
