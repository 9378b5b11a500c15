//! # Model Selection Pipeline
//!
//! For each requested family:
//!
//! 1.  Enumerate the family's fixed candidate grid.
//! 2.  Score every candidate: mean k-fold cross-validated RMSE, or in-sample
//!     RMSE for local regression.
//! 3.  Select the lowest score; ties go to the first candidate in grid order.
//! 4.  Refit on all observations with the selected hyperparameter.
//!
//! A family that cannot be fitted is excluded from the selection rather than
//! aborting the run. Only when every family fails does the run fail.

use crate::compare::rmse;
use crate::cv::{assign_folds, cross_validated_rmse};
use crate::data::{DataError, Observations};
use crate::family::{Family, Hyperparameter, Scoring};
use crate::fit::{FitError, FittedModel, fit};
use itertools::Itertools;
use rayon::prelude::*;
use thiserror::Error;

/// Settings for one selection run.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionConfig {
    /// Number of cross-validation folds.
    pub folds: usize,
    /// Seed for the fold assignment shuffle.
    pub seed: u64,
    /// Families to fit, in enumeration order.
    pub families: Vec<Family>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            folds: 10,
            seed: 1,
            families: Family::ALL.to_vec(),
        }
    }
}

/// Why a family was excluded from the selection.
#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("{rows} rows are too few for {folds}-fold cross-validation.")]
    InsufficientData { rows: usize, folds: usize },

    #[error("Cross-validation needs at least 2 folds, but {0} were configured.")]
    InvalidFoldCount(usize),

    #[error(transparent)]
    Fit(#[from] FitError),
}

/// Score of one candidate hyperparameter. `None` when the candidate could not be fitted.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub hyperparameter: Hyperparameter,
    pub rmse: Option<f64>,
}

/// All candidate scores of one family's search.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidationResult {
    pub family: Family,
    pub scoring: Scoring,
    /// Fold count, for cross-validated scoring.
    pub folds: Option<usize>,
    pub scores: Vec<CandidateScore>,
}

impl CrossValidationResult {
    /// The lowest-scoring candidate; the first one wins ties.
    pub fn best(&self) -> Option<&CandidateScore> {
        let mut best: Option<(&CandidateScore, f64)> = None;
        for candidate in &self.scores {
            if let Some(score) = candidate.rmse {
                if best.is_none_or(|(_, best_score)| score < best_score) {
                    best = Some((candidate, score));
                }
            }
        }
        best.map(|(candidate, _)| candidate)
    }
}

/// The finalized model of one family.
#[derive(Debug, Clone)]
pub struct SelectedModel {
    pub family: Family,
    /// `None` for hyperparameter-free families.
    pub hyperparameter: Option<Hyperparameter>,
    /// `None` when the family has no search.
    pub search: Option<CrossValidationResult>,
    pub model: FittedModel,
}

#[derive(Debug)]
pub struct FamilyOutcome {
    pub family: Family,
    pub result: Result<SelectedModel, SelectionError>,
}

/// Outcome of every requested family, in the order requested.
#[derive(Debug)]
pub struct Selection {
    pub outcomes: Vec<FamilyOutcome>,
}

impl Selection {
    pub fn selected(&self) -> impl Iterator<Item = &SelectedModel> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn excluded(&self) -> impl Iterator<Item = (Family, &SelectionError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.family, e)))
    }

    pub fn get(&self, family: Family) -> Option<&FamilyOutcome> {
        self.outcomes.iter().find(|o| o.family == family)
    }
}

/// Runs the search for every configured family.
///
/// Fails with `DataError::EmptyDataset` for empty input and with
/// `DataError::NoFamilyFitted` when no family could be fitted.
pub fn select_models(
    observations: &Observations,
    config: &SelectionConfig,
) -> Result<Selection, DataError> {
    if observations.is_empty() {
        return Err(DataError::EmptyDataset);
    }
    log::info!(
        "Selecting models for {} families on {} observations ({}-fold CV, seed {}).",
        config.families.len(),
        observations.len(),
        config.folds,
        config.seed
    );

    let outcomes: Vec<FamilyOutcome> = config
        .families
        .iter()
        .map(|&family| {
            let result = search_family(family, observations, config);
            match &result {
                Ok(selected) => match selected.hyperparameter {
                    Some(hp) => log::info!("  - {family}: selected {hp}"),
                    None => log::info!("  - {family}: fitted"),
                },
                Err(e) => log::warn!("  - {family}: excluded ({e})"),
            }
            FamilyOutcome { family, result }
        })
        .collect();

    if outcomes.iter().all(|o| o.result.is_err()) {
        let failures = outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| format!("  {}: {e}", o.family)))
            .join("\n");
        return Err(DataError::NoFamilyFitted { failures });
    }

    Ok(Selection { outcomes })
}

/// Searches one family's grid and refits the winner on all observations.
pub fn search_family(
    family: Family,
    observations: &Observations,
    config: &SelectionConfig,
) -> Result<SelectedModel, SelectionError> {
    let scoring = family.scoring();
    let (folds, scored) = match scoring {
        Scoring::Single => {
            let model = fit(family, None, observations)?;
            return Ok(SelectedModel {
                family,
                hyperparameter: None,
                search: None,
                model,
            });
        }
        Scoring::CrossValidated => {
            if config.folds < 2 {
                return Err(SelectionError::InvalidFoldCount(config.folds));
            }
            if observations.len() < config.folds {
                return Err(SelectionError::InsufficientData {
                    rows: observations.len(),
                    folds: config.folds,
                });
            }
            let folds = assign_folds(observations.len(), config.folds, config.seed);
            let scored = score_candidates(family, |hp| {
                cross_validated_rmse(observations, &folds, |train| fit(family, Some(hp), train))
            });
            (Some(config.folds), scored)
        }
        Scoring::InSample => {
            let scored = score_candidates(family, |hp| {
                let model = fit(family, Some(hp), observations)?;
                let predicted = model.predict_many(observations.budget.view())?;
                Ok(rmse(observations.gross.view(), predicted.view()))
            });
            (None, scored)
        }
    };

    let mut first_error = None;
    let scores = scored
        .into_iter()
        .map(|(hyperparameter, result)| {
            let rmse = match result {
                Ok(score) => {
                    log::debug!("{family} {hyperparameter}: RMSE {score:.6e}");
                    Some(score)
                }
                Err(e) => {
                    log::warn!("{family} {hyperparameter}: candidate failed ({e})");
                    first_error.get_or_insert(e);
                    None
                }
            };
            CandidateScore {
                hyperparameter,
                rmse,
            }
        })
        .collect();

    let search = CrossValidationResult {
        family,
        scoring,
        folds,
        scores,
    };
    let Some(winner) = search.best().map(|c| c.hyperparameter) else {
        return Err(match first_error {
            Some(e) => SelectionError::Fit(e),
            None => SelectionError::Fit(FitError::HyperparameterMismatch {
                family,
                hyperparameter: None,
            }),
        });
    };

    let model = fit(family, Some(winner), observations)?;
    Ok(SelectedModel {
        family,
        hyperparameter: Some(winner),
        search: Some(search),
        model,
    })
}

/// Scores every candidate of `family` in parallel, keeping grid order.
fn score_candidates<F>(family: Family, score: F) -> Vec<(Hyperparameter, Result<f64, FitError>)>
where
    F: Fn(Hyperparameter) -> Result<f64, FitError> + Sync,
{
    family
        .candidates()
        .into_par_iter()
        .map(|hp| (hp, score(hp)))
        .collect()
}
