//! # Model Comparison
//!
//! Evaluates every finalized model on the same observations it was selected
//! on (in-sample) and ranks the families by RMSE. This favours flexible
//! families: any family whose span contains a straight line can never score
//! worse than the linear baseline in-sample.
//!
//! `compare_held_out` ranks the same selections by out-of-fold predictions
//! instead, refitting each family's selected hyperparameter on every training
//! split.

use crate::cv::{assign_folds, out_of_fold_predictions};
use crate::data::Observations;
use crate::family::{Family, Hyperparameter};
use crate::fit::fit;
use crate::pipeline::{SelectedModel, Selection, SelectionConfig, SelectionError};
use ndarray::{Array1, ArrayView1};

/// In-sample fit quality of one finalized family.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub family: Family,
    pub hyperparameter: Option<Hyperparameter>,
    pub rmse: f64,
    pub r_squared: f64,
    pub n: usize,
}

/// A family that has no row in the comparison, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct ExcludedFamily {
    pub family: Family,
    pub reason: String,
}

/// Families ranked by ascending RMSE, plus the families that were excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonTable {
    pub rows: Vec<ComparisonRow>,
    pub excluded: Vec<ExcludedFamily>,
}

impl ComparisonTable {
    pub fn best(&self) -> Option<&ComparisonRow> {
        self.rows.first()
    }

    /// 1-based rank of `family`, if it was compared.
    pub fn rank_of(&self, family: Family) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.family == family)
            .map(|i| i + 1)
    }
}

/// Root mean squared residual.
pub fn rmse(observed: ArrayView1<f64>, predicted: ArrayView1<f64>) -> f64 {
    (residual_sum_of_squares(observed, predicted) / observed.len() as f64).sqrt()
}

pub fn residual_sum_of_squares(observed: ArrayView1<f64>, predicted: ArrayView1<f64>) -> f64 {
    observed
        .iter()
        .zip(predicted.iter())
        .map(|(o, p)| (o - p) * (o - p))
        .sum()
}

pub fn total_sum_of_squares(observed: ArrayView1<f64>) -> f64 {
    let mean = observed.mean().unwrap_or(0.0);
    observed.iter().map(|o| (o - mean) * (o - mean)).sum()
}

/// `1 − RSS / TSS`. Undefined (NaN) when the response is constant.
pub fn r_squared(observed: ArrayView1<f64>, predicted: ArrayView1<f64>) -> f64 {
    let tss = total_sum_of_squares(observed);
    if tss == 0.0 {
        return f64::NAN;
    }
    1.0 - residual_sum_of_squares(observed, predicted) / tss
}

/// Compares the selected models in-sample on `observations`.
///
/// Rows are sorted by ascending RMSE; equal RMSEs are ordered by family
/// enumeration order, whatever order the selection lists them in. Families that failed during
/// selection, or whose predictions fail here, are listed as excluded.
pub fn compare(selection: &Selection, observations: &Observations) -> ComparisonTable {
    build_table(selection, observations, |selected| {
        Ok(selected.model.predict_many(observations.budget.view())?)
    })
}

/// Compares the selected models on out-of-fold predictions.
///
/// Folds are assigned exactly as during selection, so the same `config` gives
/// the same splits. Every family, including the ones scored without
/// cross-validation, is refitted per fold with its selected hyperparameter.
pub fn compare_held_out(
    selection: &Selection,
    observations: &Observations,
    config: &SelectionConfig,
) -> ComparisonTable {
    if config.folds < 2 {
        return excluded_table(selection, SelectionError::InvalidFoldCount(config.folds));
    }
    if observations.len() < config.folds {
        return excluded_table(
            selection,
            SelectionError::InsufficientData {
                rows: observations.len(),
                folds: config.folds,
            },
        );
    }
    let folds = assign_folds(observations.len(), config.folds, config.seed);
    build_table(selection, observations, |selected| {
        Ok(out_of_fold_predictions(observations, &folds, |train| {
            fit(selected.family, selected.hyperparameter, train)
        })?)
    })
}

fn excluded_table(selection: &Selection, reason: SelectionError) -> ComparisonTable {
    let reason = reason.to_string();
    ComparisonTable {
        rows: Vec::new(),
        excluded: selection
            .outcomes
            .iter()
            .map(|outcome| ExcludedFamily {
                family: outcome.family,
                reason: match &outcome.result {
                    Ok(_) => reason.clone(),
                    Err(e) => e.to_string(),
                },
            })
            .collect(),
    }
}

fn build_table<P>(selection: &Selection, observations: &Observations, predict: P) -> ComparisonTable
where
    P: Fn(&SelectedModel) -> Result<Array1<f64>, SelectionError>,
{
    let mut rows = Vec::new();
    let mut excluded = Vec::new();

    for outcome in &selection.outcomes {
        let selected = match &outcome.result {
            Ok(selected) => selected,
            Err(e) => {
                excluded.push(ExcludedFamily {
                    family: outcome.family,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        match predict(selected) {
            Ok(predicted) => rows.push(ComparisonRow {
                family: selected.family,
                hyperparameter: selected.hyperparameter,
                rmse: rmse(observations.gross.view(), predicted.view()),
                r_squared: r_squared(observations.gross.view(), predicted.view()),
                n: observations.len(),
            }),
            Err(e) => {
                log::warn!("Excluding {} from comparison: {e}", selected.family);
                excluded.push(ExcludedFamily {
                    family: selected.family,
                    reason: e.to_string(),
                });
            }
        }
    }

    rows.sort_by(|a, b| a.rmse.total_cmp(&b.rmse).then(a.family.cmp(&b.family)));
    ComparisonTable { rows, excluded }
}
