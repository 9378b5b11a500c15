//! # Data Loading and Preparation Module
//!
//! This module is the only entry point for user-provided data. It reads the
//! movie table, maps every sentinel spelling of "no data" to an explicit
//! missing marker (`None`), and keeps only rows that are complete.
//!
//! - Fixed Schema: column names are not configurable. A file missing any of
//!   the schema columns is rejected with `DataError::ColumnNotFound`.
//! - Forgiving Values: malformed values are never an error. They degrade to
//!   missing and the row is dropped, so `prepare` cannot fail.
//! - Immutable Output: a `Dataset` is built once and only ever narrowed by
//!   filtering into a new `Dataset`.

use ndarray::{Array1, Axis};
use polars::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

/// Column names of the movie table, in file order.
pub const SCHEMA: [&str; 15] = [
    "budget", "company", "country", "director", "genre", "gross", "name", "rating", "released",
    "runtime", "score", "star", "votes", "writer", "year",
];

const TEXT_SENTINELS: [&str; 4] = ["", "unknown", "none", "n/a"];
const RATING_SENTINELS: [&str; 4] = ["", "unrated", "not rated", "not specified"];

/// A comprehensive error type for all data loading and validation failures.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV writer error: {0}")]
    CsvError(#[from] csv::Error),
    #[error(
        "The required column '{0}' was not found in the input file. Please check spelling and case."
    )]
    ColumnNotFound(String),
    #[error("Budget and gross vectors have different lengths ({budget} vs {gross}).")]
    ShapeMismatch { budget: usize, gross: usize },
    #[error("No complete rows remain after cleaning; every row had at least one missing field.")]
    EmptyDataset,
    #[error("Every regression family failed to fit:\n{failures}")]
    NoFamilyFitted { failures: String },
}

/// One unparsed row of the movie table. `None` means the cell was absent or null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub budget: Option<String>,
    pub company: Option<String>,
    pub country: Option<String>,
    pub director: Option<String>,
    pub genre: Option<String>,
    pub gross: Option<String>,
    pub name: Option<String>,
    pub rating: Option<String>,
    pub released: Option<String>,
    pub runtime: Option<String>,
    pub score: Option<String>,
    pub star: Option<String>,
    pub votes: Option<String>,
    pub writer: Option<String>,
    pub year: Option<String>,
}

/// One complete movie observation. `gross` is the response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub budget: f64,
    pub company: String,
    pub country: String,
    pub director: String,
    pub genre: String,
    pub gross: f64,
    pub name: String,
    pub rating: String,
    pub released: String,
    pub runtime: f64,
    pub score: f64,
    pub star: String,
    pub votes: f64,
    pub writer: String,
    pub year: f64,
}

impl Record {
    /// Converts back to the unparsed form. Numbers are written with the shortest
    /// representation that parses back to the same `f64`.
    pub fn to_raw(&self) -> RawRecord {
        let num = |v: f64| Some(v.to_string());
        let text = |v: &str| Some(v.to_string());
        RawRecord {
            budget: num(self.budget),
            company: text(&self.company),
            country: text(&self.country),
            director: text(&self.director),
            genre: text(&self.genre),
            gross: num(self.gross),
            name: text(&self.name),
            rating: text(&self.rating),
            released: text(&self.released),
            runtime: num(self.runtime),
            score: num(self.score),
            star: text(&self.star),
            votes: num(self.votes),
            writer: text(&self.writer),
            year: num(self.year),
        }
    }
}

/// An ordered, immutable collection of complete records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Returns a new dataset holding the records that satisfy `predicate`, in order.
    pub fn filter<F>(&self, predicate: F) -> Dataset
    where
        F: Fn(&Record) -> bool,
    {
        Dataset {
            records: self.records.iter().filter(|r| predicate(r)).cloned().collect(),
        }
    }

    /// Subgroup with the given rating, compared case- and whitespace-insensitively.
    pub fn with_rating(&self, rating: &str) -> Dataset {
        let wanted = normalize(rating);
        self.filter(|r| normalize(&r.rating) == wanted)
    }

    /// Projects the dataset onto the `(budget, gross)` pairs the regression works on.
    pub fn observations(&self) -> Observations {
        Observations {
            budget: self.records.iter().map(|r| r.budget).collect(),
            gross: self.records.iter().map(|r| r.gross).collect(),
        }
    }

    pub fn to_raw(&self) -> Vec<RawRecord> {
        self.records.iter().map(Record::to_raw).collect()
    }

    /// Writes the prepared records as a comma-separated file with a header row.
    pub fn write_csv(&self, path: &str) -> Result<(), DataError> {
        let mut writer = csv::Writer::from_path(path)?;
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// The predictor/response pairs of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Observations {
    pub budget: Array1<f64>,
    pub gross: Array1<f64>,
}

impl Observations {
    pub fn new(budget: Array1<f64>, gross: Array1<f64>) -> Result<Self, DataError> {
        if budget.len() != gross.len() {
            return Err(DataError::ShapeMismatch {
                budget: budget.len(),
                gross: gross.len(),
            });
        }
        Ok(Self { budget, gross })
    }

    pub fn len(&self) -> usize {
        self.budget.len()
    }

    pub fn is_empty(&self) -> bool {
        self.budget.is_empty()
    }

    /// Rows at `indices`, in the given order.
    pub fn subset(&self, indices: &[usize]) -> Observations {
        Observations {
            budget: self.budget.select(Axis(0), indices),
            gross: self.gross.select(Axis(0), indices),
        }
    }
}

/// Cleans raw rows into a `Dataset`. Never fails; rows with any missing field
/// are dropped, so the result may be empty.
pub fn prepare(raw_rows: &[RawRecord]) -> Dataset {
    let records: Vec<Record> = raw_rows.iter().filter_map(internal::parse_record).collect();
    log::debug!(
        "Prepared {} complete records from {} raw rows ({} dropped).",
        records.len(),
        raw_rows.len(),
        raw_rows.len() - records.len()
    );
    Dataset { records }
}

/// Reads every schema column of a comma- (or, for `.tsv` files, tab-) separated
/// file as text.
pub fn load_raw_records(path: &str) -> Result<Vec<RawRecord>, DataError> {
    let separator = if path.ends_with(".tsv") { b'\t' } else { b',' };
    log::info!("Loading data from '{path}'");

    let df = CsvReader::new(File::open(Path::new(path))?)
        .with_options(
            CsvReadOptions::default()
                .with_has_header(true)
                .with_infer_schema_length(Some(0))
                .with_parse_options(CsvParseOptions::default().with_separator(separator)),
        )
        .finish()?;

    let columns: HashSet<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();
    for name in SCHEMA {
        if !columns.contains(name) {
            return Err(DataError::ColumnNotFound(name.to_string()));
        }
    }

    let mut cells: Vec<Vec<Option<String>>> = SCHEMA
        .iter()
        .map(|name| internal::extract_text_column(&df, name))
        .collect::<Result<_, _>>()?;

    let mut take = |field: usize, row: usize| cells[field][row].take();
    let rows = (0..df.height())
        .map(|row| RawRecord {
            budget: take(0, row),
            company: take(1, row),
            country: take(2, row),
            director: take(3, row),
            genre: take(4, row),
            gross: take(5, row),
            name: take(6, row),
            rating: take(7, row),
            released: take(8, row),
            runtime: take(9, row),
            score: take(10, row),
            star: take(11, row),
            votes: take(12, row),
            writer: take(13, row),
            year: take(14, row),
        })
        .collect();
    Ok(rows)
}

/// Loads and prepares a movie table in one step.
pub fn load_dataset(path: &str) -> Result<Dataset, DataError> {
    let raw = load_raw_records(path)?;
    let dataset = prepare(&raw);
    log::info!(
        "Kept {} of {} rows after removing records with missing fields.",
        dataset.len(),
        raw.len()
    );
    Ok(dataset)
}

fn normalize(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

mod internal {
    use super::*;

    pub(super) fn extract_text_column(
        df: &DataFrame,
        column_name: &str,
    ) -> Result<Vec<Option<String>>, DataError> {
        let casted = df.column(column_name)?.cast(&DataType::String)?;
        let values = casted.str()?;
        Ok(values.into_iter().map(|v| v.map(str::to_string)).collect())
    }

    pub(super) fn parse_numeric(value: Option<&str>) -> Option<f64> {
        let parsed: f64 = value?.trim().parse().ok()?;
        (parsed.is_finite() && parsed != 0.0).then_some(parsed)
    }

    pub(super) fn parse_text(value: Option<&str>) -> Option<String> {
        let trimmed = value?.trim();
        let lowered = trimmed.to_ascii_lowercase();
        (!TEXT_SENTINELS.contains(&lowered.as_str())).then(|| trimmed.to_string())
    }

    pub(super) fn parse_rating(value: Option<&str>) -> Option<String> {
        let trimmed = value?.trim();
        (!RATING_SENTINELS.contains(&normalize(trimmed).as_str())).then(|| trimmed.to_string())
    }

    pub(super) fn parse_record(raw: &RawRecord) -> Option<Record> {
        Some(Record {
            budget: parse_numeric(raw.budget.as_deref())?,
            company: parse_text(raw.company.as_deref())?,
            country: parse_text(raw.country.as_deref())?,
            director: parse_text(raw.director.as_deref())?,
            genre: parse_text(raw.genre.as_deref())?,
            gross: parse_numeric(raw.gross.as_deref())?,
            name: parse_text(raw.name.as_deref())?,
            rating: parse_rating(raw.rating.as_deref())?,
            released: parse_text(raw.released.as_deref())?,
            runtime: parse_numeric(raw.runtime.as_deref())?,
            score: parse_numeric(raw.score.as_deref())?,
            star: parse_text(raw.star.as_deref())?,
            votes: parse_numeric(raw.votes.as_deref())?,
            writer: parse_text(raw.writer.as_deref())?,
            year: parse_numeric(raw.year.as_deref())?,
        })
    }
}
