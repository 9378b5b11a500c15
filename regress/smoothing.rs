//! # Smoothing Spline
//!
//! A penalized cubic regression spline (P-spline): a cubic B-spline basis on
//! uniformly spaced knots with a second-order difference penalty on the
//! coefficients. The amount of smoothing is not a user hyperparameter; it is
//! chosen by generalized cross-validation over a fixed grid of smoothing
//! parameters, so from the outside the family is fitted in a single call.
//!
//! For a trial λ the coefficients solve `(BᵀB + λS) β = Bᵀy`, the effective
//! degrees of freedom are `tr((BᵀB + λS)⁻¹ BᵀB)` and
//! `GCV(λ) = n · RSS / (n − edf)²`.

use crate::basis::{
    self, bspline_basis_for_knots, create_bspline_basis, create_difference_penalty_matrix,
};
use crate::family::Family;
use crate::fit::FitError;
use itertools::Itertools;
use ndarray::{Array1, ArrayView1};
use ndarray_linalg::{Inverse, Solve};

const SPLINE_DEGREE: usize = 3;
const PENALTY_ORDER: usize = 2;
const MAX_INTERNAL_KNOTS: usize = 20;
/// A cubic spline with a second-order penalty needs four distinct abscissae.
const MIN_DISTINCT_VALUES: usize = 4;
/// log10 of the smoothing parameter, relative to `tr(BᵀB) / tr(S)`.
const LOG_LAMBDA_GRID: (f64, f64, usize) = (-6.0, 6.0, 49);

/// A fitted smoothing spline. Beyond the training range the curve continues
/// linearly with the slope it has at the boundary.
#[derive(Debug, Clone)]
pub struct SmoothingSplineFit {
    range: (f64, f64),
    knots: Array1<f64>,
    coefficients: Array1<f64>,
    lambda: f64,
    edf: f64,
    boundary_slopes: (f64, f64),
}

impl SmoothingSplineFit {
    pub fn fit(x: ArrayView1<f64>, y: ArrayView1<f64>) -> Result<Self, FitError> {
        let n = x.len();
        let distinct = count_distinct(x);
        if distinct < MIN_DISTINCT_VALUES {
            return Err(FitError::TooFewDistinctValues {
                family: Family::SmoothingSpline,
                needed: MIN_DISTINCT_VALUES,
                found: distinct,
            });
        }

        let range = basis::data_range(x);
        let num_internal_knots = (distinct - 2).min(MAX_INTERNAL_KNOTS);
        let (b, knots) = create_bspline_basis(x, range, num_internal_knots, SPLINE_DEGREE)?;
        let s = create_difference_penalty_matrix(b.ncols(), PENALTY_ORDER)?;

        let btb = b.t().dot(&b);
        let bty = b.t().dot(&y);
        let lambda_scale = btb.diag().sum() / s.diag().sum();

        let (lo, hi, steps) = LOG_LAMBDA_GRID;
        let mut best: Option<(f64, f64, f64, Array1<f64>)> = None;
        for step in 0..steps {
            let log_lambda = lo + (hi - lo) * step as f64 / (steps - 1) as f64;
            let lambda = 10f64.powf(log_lambda) * lambda_scale;
            let a = &btb + &(&s * lambda);

            let beta = match a.solve(&bty) {
                Ok(beta) => beta,
                Err(e) => {
                    log::debug!("Smoothing solve failed at λ={lambda:.3e}: {e}");
                    continue;
                }
            };
            let a_inv = match a.inv() {
                Ok(inv) => inv,
                Err(e) => {
                    log::debug!("Smoothing inverse failed at λ={lambda:.3e}: {e}");
                    continue;
                }
            };

            let edf = a_inv.dot(&btb).diag().sum();
            let residuals = &y - &b.dot(&beta);
            let rss = residuals.dot(&residuals);
            let dof = n as f64 - edf;
            if dof <= 1e-8 {
                continue;
            }
            let gcv = n as f64 * rss / (dof * dof);
            if !gcv.is_finite() {
                continue;
            }
            if best.as_ref().is_none_or(|(best_gcv, ..)| gcv < *best_gcv) {
                best = Some((gcv, lambda, edf, beta));
            }
        }

        let (gcv, lambda, edf, coefficients) = best.ok_or(FitError::NoSmoothingParameter)?;
        log::debug!("Smoothing spline selected λ={lambda:.3e} (edf={edf:.2}, GCV={gcv:.4e}).");

        let mut fit = Self {
            range,
            knots,
            coefficients,
            lambda,
            edf,
            boundary_slopes: (0.0, 0.0),
        };
        fit.boundary_slopes = fit.compute_boundary_slopes();
        Ok(fit)
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn effective_degrees_of_freedom(&self) -> f64 {
        self.edf
    }

    pub fn predict_many(&self, budget: ArrayView1<f64>) -> Array1<f64> {
        let (lo, hi) = self.range;
        let clamped = budget.mapv(|x| x.clamp(lo, hi));
        let inside = self.evaluate(clamped.view());
        let (slope_lo, slope_hi) = self.boundary_slopes;
        inside
            .iter()
            .zip(budget.iter())
            .map(|(&value, &x)| {
                if x < lo {
                    value + slope_lo * (x - lo)
                } else if x > hi {
                    value + slope_hi * (x - hi)
                } else {
                    value
                }
            })
            .collect()
    }

    fn evaluate(&self, x: ArrayView1<f64>) -> Array1<f64> {
        bspline_basis_for_knots(x, self.knots.view(), SPLINE_DEGREE).dot(&self.coefficients)
    }

    /// One-sided difference quotients just inside each boundary.
    fn compute_boundary_slopes(&self) -> (f64, f64) {
        let (lo, hi) = self.range;
        let h = (hi - lo) * 1e-6;
        let points = Array1::from_vec(vec![lo, lo + h, hi - h, hi]);
        let values = self.evaluate(points.view());
        ((values[1] - values[0]) / h, (values[3] - values[2]) / h)
    }
}

fn count_distinct(x: ArrayView1<f64>) -> usize {
    x.iter().copied().sorted_by(f64::total_cmp).dedup().count()
}
