//! # Local Regression
//!
//! Locally weighted quadratic regression in the style of `loess` with its
//! default settings: for every evaluation point the `⌊n · span⌋` nearest
//! training budgets are weighted with the tricube kernel and a weighted
//! degree-2 polynomial is fitted; its value at the evaluation point is the
//! prediction.
//!
//! Predictions are computed directly (no interpolation over a vertex grid),
//! so every evaluation is an independent local fit and is parallelized with
//! rayon.

use crate::basis;
use crate::family::LOCAL_DEGREE;
use crate::fit::{FitError, least_squares};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;

/// A local-regression smoother. It keeps the training sample, because every
/// prediction is a fresh weighted fit around the requested budget.
#[derive(Debug, Clone)]
pub struct LocalFit {
    budget: Array1<f64>,
    gross: Array1<f64>,
    span: f64,
    scale: f64,
}

impl LocalFit {
    pub fn fit(x: ArrayView1<f64>, y: ArrayView1<f64>, span: f64) -> Result<Self, FitError> {
        if x.is_empty() {
            return Err(FitError::EmptyData);
        }
        if !span.is_finite() {
            return Err(FitError::NonFinite("span"));
        }
        if span <= 0.0 {
            return Err(FitError::InvalidSpan(span));
        }
        let (min_val, max_val) = basis::data_range(x);
        let width = max_val - min_val;
        Ok(Self {
            budget: x.to_owned(),
            gross: y.to_owned(),
            span,
            scale: if width > 0.0 { width } else { 1.0 },
        })
    }

    pub fn span(&self) -> f64 {
        self.span
    }

    /// Number of neighbours in each local fit.
    pub fn neighbourhood_size(&self) -> usize {
        let n = self.budget.len();
        ((n as f64 * self.span.min(1.0)).floor() as usize)
            .max(LOCAL_DEGREE + 1)
            .min(n)
    }

    pub fn predict_many(&self, budget: ArrayView1<f64>) -> Result<Array1<f64>, FitError> {
        let values = budget
            .to_vec()
            .into_par_iter()
            .map(|x0| self.predict_point(x0))
            .collect::<Result<Vec<f64>, FitError>>()?;
        Ok(Array1::from_vec(values))
    }

    fn predict_point(&self, x0: f64) -> Result<f64, FitError> {
        let q = self.neighbourhood_size();

        let mut distances: Vec<(f64, usize)> = self
            .budget
            .iter()
            .enumerate()
            .map(|(i, &b)| (((b - x0) / self.scale).abs(), i))
            .collect();
        distances.select_nth_unstable_by(q - 1, |a, b| a.0.total_cmp(&b.0));
        let neighbours = &distances[..q];

        // Beyond a span of 1 the bandwidth keeps growing past the farthest point.
        let mut bandwidth = distances[q - 1].0;
        if self.span > 1.0 {
            bandwidth *= self.span;
        }

        let mut weights: Vec<f64> = neighbours
            .iter()
            .map(|&(d, _)| if bandwidth > 0.0 { tricube(d / bandwidth) } else { 1.0 })
            .collect();
        if weights.iter().all(|&w| w <= 0.0) {
            weights.iter_mut().for_each(|w| *w = 1.0);
        }

        let mut design = Array2::zeros((q, LOCAL_DEGREE + 1));
        let mut rhs = Array1::zeros(q);
        for (row, (&(_, i), &w)) in neighbours.iter().zip(weights.iter()).enumerate() {
            let root_w = w.sqrt();
            let t = (self.budget[i] - x0) / self.scale;
            let mut power = root_w;
            for j in 0..=LOCAL_DEGREE {
                design[[row, j]] = power;
                power *= t;
            }
            rhs[row] = root_w * self.gross[i];
        }

        // Centred at x0, so the intercept is the fitted value.
        let beta = least_squares(design, rhs.view())?;
        Ok(beta[0])
    }
}

fn tricube(u: f64) -> f64 {
    if u >= 1.0 {
        0.0
    } else {
        let v = 1.0 - u * u * u;
        v * v * v
    }
}
