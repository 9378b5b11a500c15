//! Text and TSV output for comparison tables, search scores and fitted curves.
//!
//! Plots are not drawn here. The curve export evaluates every fitted model on
//! an evenly spaced budget grid so any plotting tool can overlay the curves on
//! the raw scatter.

use crate::basis::data_range;
use crate::compare::ComparisonTable;
use crate::data::Observations;
use crate::fit::FitError;
use crate::pipeline::Selection;
use ndarray::Array1;
use serde::Serialize;
use std::fmt::Write as _;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Evaluating a fitted curve failed: {0}")]
    FitError(#[from] FitError),
    #[error("A curve grid needs at least 2 points, but {0} were requested.")]
    InvalidGrid(usize),
}

#[derive(Serialize)]
struct ComparisonRecord<'a> {
    rank: usize,
    family: &'a str,
    hyperparameter: String,
    rmse: f64,
    r_squared: f64,
    n: usize,
}

#[derive(Serialize)]
struct SearchRecord<'a> {
    family: &'a str,
    hyperparameter: String,
    rmse: Option<f64>,
    selected: bool,
}

fn hyperparameter_label<T: std::fmt::Display>(hp: Option<T>) -> String {
    hp.map_or_else(|| "-".to_string(), |hp| hp.to_string())
}

/// Renders the ranked comparison table, followed by any excluded families.
pub fn render_comparison(table: &ComparisonTable) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<18} {:<12} {:>16} {:>10}",
        "rank", "family", "setting", "RMSE", "R²"
    );
    for (i, row) in table.rows.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>4}  {:<18} {:<12} {:>16.4e} {:>10.4}",
            i + 1,
            row.family.name(),
            hyperparameter_label(row.hyperparameter),
            row.rmse,
            row.r_squared
        );
    }
    if !table.excluded.is_empty() {
        let _ = writeln!(out, "\nExcluded families:");
        for excluded in &table.excluded {
            let _ = writeln!(out, "  {:<18} {}", excluded.family.name(), excluded.reason);
        }
    }
    out
}

/// Renders each family's candidate scores, marking the selected candidate.
pub fn render_search(selection: &Selection) -> String {
    let mut out = String::new();
    for selected in selection.selected() {
        let Some(search) = &selected.search else {
            continue;
        };
        let method = match search.folds {
            Some(k) => format!("{k}-fold CV RMSE"),
            None => "in-sample RMSE".to_string(),
        };
        let _ = writeln!(out, "{} ({method}):", selected.family);
        for score in &search.scores {
            let marker = if Some(score.hyperparameter) == selected.hyperparameter {
                "*"
            } else {
                " "
            };
            let value = score
                .rmse
                .map_or_else(|| "failed".to_string(), |v| format!("{v:.4e}"));
            let _ = writeln!(out, "  {marker} {:<12} {value}", score.hyperparameter.to_string());
        }
    }
    out
}

/// Writes the ranked comparison table as TSV.
pub fn write_comparison_tsv(table: &ComparisonTable, path: &str) -> Result<(), ReportError> {
    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    for (i, row) in table.rows.iter().enumerate() {
        writer.serialize(ComparisonRecord {
            rank: i + 1,
            family: row.family.name(),
            hyperparameter: hyperparameter_label(row.hyperparameter),
            rmse: row.rmse,
            r_squared: row.r_squared,
            n: row.n,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes every candidate score of every searched family as TSV.
pub fn write_search_tsv(selection: &Selection, path: &str) -> Result<(), ReportError> {
    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    for selected in selection.selected() {
        let Some(search) = &selected.search else {
            continue;
        };
        for score in &search.scores {
            writer.serialize(SearchRecord {
                family: selected.family.name(),
                hyperparameter: score.hyperparameter.to_string(),
                rmse: score.rmse,
                selected: Some(score.hyperparameter) == selected.hyperparameter,
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Evaluates every selected model on `grid_points` evenly spaced budgets spanning
/// the observed range and writes one column per family.
pub fn write_curves_tsv(
    selection: &Selection,
    observations: &Observations,
    grid_points: usize,
    path: &str,
) -> Result<(), ReportError> {
    if grid_points < 2 {
        return Err(ReportError::InvalidGrid(grid_points));
    }
    let (lo, hi) = data_range(observations.budget.view());
    let grid = Array1::linspace(lo, hi, grid_points);

    let mut header = vec!["budget".to_string()];
    let mut curves = Vec::new();
    for selected in selection.selected() {
        header.push(selected.family.name().to_string());
        curves.push(selected.model.predict_many(grid.view())?);
    }

    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    writer.write_record(&header)?;
    for (i, budget) in grid.iter().enumerate() {
        let mut record = vec![budget.to_string()];
        record.extend(curves.iter().map(|curve| curve[i].to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
