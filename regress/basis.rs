//! # Feature-Matrix Builders
//!
//! Every regression family in this crate is a linear model over some basis
//! expansion of `budget`. This module turns a vector of budgets plus a
//! hyperparameter into the corresponding design matrix, so no model is ever
//! described by a formula string.
//!
//! All builders take the range (or knots) of the *training* data explicitly.
//! The same range must be passed again at prediction time so that new points
//! are expanded in exactly the same basis the coefficients were fitted in.

use ndarray::{Array, Array1, Array2, ArrayView1, s};
use thiserror::Error;

/// A comprehensive error type for all operations within the basis module.
#[derive(Error, Debug)]
pub enum BasisError {
    #[error("Spline degree must be at least 1, but was {0}.")]
    InvalidDegree(usize),

    #[error("Data range is invalid: start ({0}) must be less than or equal to end ({1}).")]
    InvalidRange(f64, f64),

    #[error("Data range ({0}, {0}) has zero width; budget must take at least two distinct values.")]
    DegenerateRange(f64),

    #[error("Step functions need at least 2 intervals, but {0} were requested.")]
    InvalidBreaks(usize),

    #[error("Natural splines need at least 1 degree of freedom, but {0} were requested.")]
    InvalidDegreesOfFreedom(usize),

    #[error("Quantile strategy requires a non-empty training data set for quantile calculation.")]
    QuantileDataMissing,

    #[error("Cannot compute {num_quantiles} quantiles from only {num_points} data points.")]
    InsufficientDataForQuantiles {
        num_quantiles: usize,
        num_points: usize,
    },

    #[error(
        "Penalty order ({order}) must be positive and less than the number of basis functions ({num_basis})."
    )]
    InvalidPenaltyOrder { order: usize, num_basis: usize },
}

/// Returns `(min, max)` of a data vector. An empty vector yields `(inf, -inf)`.
pub fn data_range(data: ArrayView1<f64>) -> (f64, f64) {
    let min_val = data.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max_val = data.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    (min_val, max_val)
}

fn check_range(data_range: (f64, f64)) -> Result<(), BasisError> {
    if !(data_range.0 <= data_range.1) {
        return Err(BasisError::InvalidRange(data_range.0, data_range.1));
    }
    if data_range.0 == data_range.1 {
        return Err(BasisError::DegenerateRange(data_range.0));
    }
    Ok(())
}

/// Maps `x` from `data_range` onto `[-1, 1]`.
fn to_symmetric_unit(x: f64, data_range: (f64, f64)) -> f64 {
    2.0 * (x - data_range.0) / (data_range.1 - data_range.0) - 1.0
}

/// Builds the polynomial design `[1, u, u², …, u^degree]` where `u` is the budget
/// rescaled from `data_range` onto `[-1, 1]`.
///
/// The rescaling leaves the spanned function space unchanged (it is the same as
/// raw powers of the budget) but keeps the columns well conditioned when budgets
/// are in the hundreds of millions.
pub fn polynomial_basis(
    data: ArrayView1<f64>,
    data_range: (f64, f64),
    degree: usize,
) -> Result<Array2<f64>, BasisError> {
    if degree < 1 {
        return Err(BasisError::InvalidDegree(degree));
    }
    check_range(data_range)?;

    let mut basis = Array2::zeros((data.len(), degree + 1));
    for (i, &x) in data.iter().enumerate() {
        let u = to_symmetric_unit(x, data_range);
        let mut power = 1.0;
        for j in 0..=degree {
            basis[[i, j]] = power;
            power *= u;
        }
    }
    Ok(basis)
}

/// Index of the equal-width interval of `data_range` that contains `x`.
///
/// Intervals are closed on the right except the first, which also includes the
/// lower boundary. Points outside the range fall into the nearest end interval.
pub fn step_interval(x: f64, data_range: (f64, f64), breaks: usize) -> usize {
    let width = (data_range.1 - data_range.0) / breaks as f64;
    let position = ((x - data_range.0) / width).ceil();
    if position.is_nan() || position <= 1.0 {
        0
    } else {
        (position as usize - 1).min(breaks - 1)
    }
}

/// Builds a piecewise-constant design: an intercept followed by one indicator
/// column for each of the intervals `2..=breaks` (the first interval is the
/// baseline absorbed by the intercept).
pub fn step_basis(
    data: ArrayView1<f64>,
    data_range: (f64, f64),
    breaks: usize,
) -> Result<Array2<f64>, BasisError> {
    if breaks < 2 {
        return Err(BasisError::InvalidBreaks(breaks));
    }
    check_range(data_range)?;

    let mut basis = Array2::zeros((data.len(), breaks));
    basis.column_mut(0).fill(1.0);
    for (i, &x) in data.iter().enumerate() {
        let interval = step_interval(x, data_range, breaks);
        if interval > 0 {
            basis[[i, interval]] = 1.0;
        }
    }
    Ok(basis)
}

/// Places the knots of a natural cubic spline with `df` degrees of freedom:
/// the two boundary knots at the ends of the training data and `df - 1`
/// interior knots at its evenly spaced quantiles.
pub fn natural_spline_knots(
    training_data: ArrayView1<f64>,
    df: usize,
) -> Result<Array1<f64>, BasisError> {
    if df < 1 {
        return Err(BasisError::InvalidDegreesOfFreedom(df));
    }
    if training_data.is_empty() {
        return Err(BasisError::QuantileDataMissing);
    }
    let range = data_range(training_data);
    check_range(range)?;

    let interior = internal::quantiles(training_data, df - 1)?;
    let mut knots = Vec::with_capacity(df + 1);
    knots.push(range.0);
    knots.extend(interior.iter().copied());
    knots.push(range.1);
    Ok(Array1::from_vec(knots))
}

/// Builds the natural cubic spline design for the given knot sequence
/// (boundary knots first and last).
///
/// Uses the truncated-power construction: `N₁ = 1`, `N₂ = u`, and
/// `N_{k+2} = d_k(u) − d_{K−1}(u)` with
/// `d_k(u) = ((u − ξ_k)³₊ − (u − ξ_K)³₊) / (ξ_K − ξ_k)`.
/// The result has one column per knot; it includes the intercept, is cubic
/// between the boundary knots and linear beyond them.
pub fn natural_spline_basis(
    data: ArrayView1<f64>,
    knots: ArrayView1<f64>,
) -> Result<Array2<f64>, BasisError> {
    let num_knots = knots.len();
    if num_knots < 2 {
        return Err(BasisError::InvalidDegreesOfFreedom(num_knots.saturating_sub(1)));
    }
    let range = (knots[0], knots[num_knots - 1]);
    check_range(range)?;

    // Work on the unit interval; the spanned space is invariant under the affine map.
    let width = range.1 - range.0;
    let unit_knots = knots.mapv(|k| (k - range.0) / width);
    let last = unit_knots[num_knots - 1];

    let cube_plus = |v: f64| if v > 0.0 { v * v * v } else { 0.0 };
    let d = |u: f64, k: usize| {
        let denom = last - unit_knots[k];
        if denom <= 1e-12 {
            0.0
        } else {
            (cube_plus(u - unit_knots[k]) - cube_plus(u - last)) / denom
        }
    };

    let mut basis = Array2::zeros((data.len(), num_knots));
    for (i, &x) in data.iter().enumerate() {
        let u = (x - range.0) / width;
        basis[[i, 0]] = 1.0;
        basis[[i, 1]] = u;
        let d_last = d(u, num_knots - 2);
        for k in 0..num_knots - 2 {
            basis[[i, k + 2]] = d(u, k) - d_last;
        }
    }
    Ok(basis)
}

/// Creates a B-spline basis expansion matrix and its corresponding knot vector.
///
/// Knots are placed uniformly across `data_range` and continue with the same
/// spacing for `degree` knots beyond each end, so equally spaced coefficients
/// reproduce a straight line exactly. `data_range` must always be the range of
/// the original training data, even when evaluating new points.
///
/// # Returns
///
/// 1.  The **basis matrix**, with shape `[data.len(), num_internal_knots + degree + 1]`.
/// 2.  The **full knot vector** used to generate the basis.
pub fn create_bspline_basis(
    data: ArrayView1<f64>,
    data_range: (f64, f64),
    num_internal_knots: usize,
    degree: usize,
) -> Result<(Array2<f64>, Array1<f64>), BasisError> {
    if degree < 1 {
        return Err(BasisError::InvalidDegree(degree));
    }
    if data_range.0 > data_range.1 {
        return Err(BasisError::InvalidRange(data_range.0, data_range.1));
    }

    let knot_vector = internal::generate_full_knot_vector(data_range, num_internal_knots, degree);
    let basis_matrix = bspline_basis_for_knots(data, knot_vector.view(), degree);
    Ok((basis_matrix, knot_vector))
}

/// Evaluates the B-spline basis defined by an existing knot vector.
pub fn bspline_basis_for_knots(
    data: ArrayView1<f64>,
    knot_vector: ArrayView1<f64>,
    degree: usize,
) -> Array2<f64> {
    let num_basis_functions = knot_vector.len() - degree - 1;
    let mut basis_matrix = Array2::zeros((data.len(), num_basis_functions));
    for (i, &x) in data.iter().enumerate() {
        let basis_row = internal::evaluate_splines_at_point(x, degree, knot_vector);
        basis_matrix.row_mut(i).assign(&basis_row);
    }
    basis_matrix
}

/// Creates a penalty matrix `S = D' * D` from the `order`-th difference matrix `D`,
/// penalizing the squared `order`-th differences of the spline coefficients.
pub fn create_difference_penalty_matrix(
    num_basis_functions: usize,
    order: usize,
) -> Result<Array2<f64>, BasisError> {
    if order == 0 || order >= num_basis_functions {
        return Err(BasisError::InvalidPenaltyOrder {
            order,
            num_basis: num_basis_functions,
        });
    }

    let mut d = Array2::<f64>::eye(num_basis_functions);
    for _ in 0..order {
        d = &d.slice(s![1.., ..]) - &d.slice(s![..-1, ..]);
    }

    Ok(d.t().dot(&d))
}

/// Internal module for implementation details not exposed in the public API.
mod internal {
    use super::*;

    /// Generates the full uniform knot vector: the internal knots plus `degree + 1`
    /// knots at and beyond each boundary, all with the same spacing.
    pub(super) fn generate_full_knot_vector(
        data_range: (f64, f64),
        num_internal_knots: usize,
        degree: usize,
    ) -> Array1<f64> {
        let (min_val, max_val) = data_range;
        let h = (max_val - min_val) / (num_internal_knots as f64 + 1.0);
        let total = num_internal_knots + 2 * (degree + 1);
        Array::from_iter((0..total).map(|i| min_val + (i as f64 - degree as f64) * h))
    }

    /// Calculates quantiles from a data vector using linear interpolation (Type 7 in R).
    pub(super) fn quantiles(
        data: ArrayView1<f64>,
        num_quantiles: usize,
    ) -> Result<Array1<f64>, BasisError> {
        if num_quantiles == 0 {
            return Ok(Array1::from_vec(vec![]));
        }
        if data.is_empty() {
            return Err(BasisError::QuantileDataMissing);
        }
        if data.len() < 2 {
            return Err(BasisError::InsufficientDataForQuantiles {
                num_quantiles,
                num_points: data.len(),
            });
        }

        let mut sorted_data = data.to_vec();
        sorted_data.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let n = sorted_data.len();
        let quantiles_vec = (1..=num_quantiles)
            .map(|k| {
                let p = k as f64 / (num_quantiles as f64 + 1.0);
                let float_idx = (n as f64 - 1.0) * p;
                let lower_idx = float_idx.floor() as usize;
                let upper_idx = float_idx.ceil() as usize;

                if lower_idx == upper_idx {
                    sorted_data[lower_idx]
                } else {
                    let fraction = float_idx - lower_idx as f64;
                    sorted_data[lower_idx] * (1.0 - fraction) + sorted_data[upper_idx] * fraction
                }
            })
            .collect();

        Ok(Array1::from_vec(quantiles_vec))
    }

    /// Evaluates all B-spline basis functions at a single point `x` with the
    /// triangular Cox-de Boor scheme.
    ///
    /// The knot span is clamped to `[degree, num_basis - 1]`, the spans on which
    /// the basis is complete. The right boundary therefore evaluates the last
    /// polynomial piece instead of an empty span, and points outside the range
    /// continue the end pieces.
    pub(super) fn evaluate_splines_at_point(
        x: f64,
        degree: usize,
        knots: ArrayView1<f64>,
    ) -> Array1<f64> {
        let num_knots = knots.len();
        let num_basis = num_knots - degree - 1;

        let mu = match knots.iter().rposition(|&k| k <= x) {
            Some(pos) => pos.clamp(degree, num_basis - 1),
            None => degree,
        };

        let mut left = vec![0.0; degree + 1];
        let mut right = vec![0.0; degree + 1];
        let mut n = vec![0.0; degree + 1];
        n[0] = 1.0;

        for j in 1..=degree {
            left[j] = x - knots[mu + 1 - j];
            right[j] = knots[mu + j] - x;
            let mut saved = 0.0;
            for r in 0..j {
                let denom = right[r + 1] + left[j - r];
                let temp = if denom.abs() > 1e-12 { n[r] / denom } else { 0.0 };
                n[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            n[j] = saved;
        }

        let mut basis_values = Array1::zeros(num_basis);
        let start_index = mu - degree;
        for (i, &value) in n.iter().enumerate() {
            basis_values[start_index + i] = value;
        }
        basis_values
    }
}
