//! k-fold cross-validation.
//!
//! Fold membership depends only on the row count, the fold count and the seed,
//! so every candidate of every family is scored on identical splits.

use crate::compare::rmse;
use crate::data::Observations;
use crate::fit::{FitError, FittedModel};
use ndarray::Array1;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Held-out row indices for each of `k` folds.
///
/// Row indices are shuffled with a seeded generator and dealt round-robin, so
/// fold sizes differ by at most one. With `n >= k` no fold is empty.
pub fn assign_folds(n: usize, k: usize, seed: u64) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let mut folds = vec![Vec::with_capacity(n / k.max(1) + 1); k];
    for (position, index) in order.into_iter().enumerate() {
        folds[position % k].push(index);
    }
    for fold in &mut folds {
        fold.sort_unstable();
    }
    folds
}

/// Runs `visit(held_out_indices, test_split, predictions)` for every fold, where
/// the predictions come from a model fitted with `fit` on the remaining rows.
fn for_each_fold<F, V>(
    observations: &Observations,
    folds: &[Vec<usize>],
    fit: F,
    mut visit: V,
) -> Result<(), FitError>
where
    F: Fn(&Observations) -> Result<FittedModel, FitError>,
    V: FnMut(&[usize], &Observations, Array1<f64>),
{
    let n = observations.len();
    let mut in_test = vec![false; n];

    for held_out in folds {
        in_test.iter_mut().for_each(|flag| *flag = false);
        for &i in held_out {
            in_test[i] = true;
        }
        let training: Vec<usize> = (0..n).filter(|&i| !in_test[i]).collect();

        let train = observations.subset(&training);
        let test = observations.subset(held_out);
        let model = fit(&train)?;
        let predicted = model.predict_many(test.budget.view())?;
        visit(held_out, &test, predicted);
    }
    Ok(())
}

/// Mean held-out RMSE over `folds`, fitting each training split with `fit`.
pub fn cross_validated_rmse<F>(
    observations: &Observations,
    folds: &[Vec<usize>],
    fit: F,
) -> Result<f64, FitError>
where
    F: Fn(&Observations) -> Result<FittedModel, FitError>,
{
    let mut total = 0.0;
    for_each_fold(observations, folds, fit, |_, test, predicted| {
        total += rmse(test.gross.view(), predicted.view());
    })?;
    Ok(total / folds.len() as f64)
}

/// Prediction for every row from the model that did not see that row's fold.
pub fn out_of_fold_predictions<F>(
    observations: &Observations,
    folds: &[Vec<usize>],
    fit: F,
) -> Result<Array1<f64>, FitError>
where
    F: Fn(&Observations) -> Result<FittedModel, FitError>,
{
    let mut predictions = Array1::from_elem(observations.len(), f64::NAN);
    for_each_fold(observations, folds, fit, |held_out, _, predicted| {
        for (&row, &value) in held_out.iter().zip(predicted.iter()) {
            predictions[row] = value;
        }
    })?;
    Ok(predictions)
}
