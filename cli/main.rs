#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]

use clap::{Args, Parser, Subcommand};
use std::process;

use boxoffice::compare::{compare, compare_held_out};
use boxoffice::data::{DataError, Dataset, load_dataset};
use boxoffice::pipeline::{SelectionConfig, select_models};
use boxoffice::report::{
    render_comparison, render_search, write_comparison_tsv, write_curves_tsv, write_search_tsv,
};

#[derive(Parser)]
#[command(
    name = "boxoffice",
    about = "Select and compare regression models of box-office gross against budget",
    long_about = "Fits linear, polynomial, step-function, natural-spline, smoothing-spline and \
                  local regression models of gross on budget, tunes each family by k-fold \
                  cross-validation, and ranks the finalized models by RMSE and R²."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the model selection pipeline and print the comparison table
    Select(SelectArgs),

    /// Write the cleaned dataset (rows with missing fields removed) to a CSV file
    Clean(CleanArgs),
}

#[derive(Args)]
struct SelectArgs {
    /// Path to the movie CSV (TSV if the name ends in .tsv)
    data: String,

    /// Restrict the analysis to one rating, e.g. "PG-13"
    #[arg(long)]
    rating: Option<String>,

    /// Number of cross-validation folds
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(2..))]
    folds: u32,

    /// Seed for the cross-validation fold assignment
    #[arg(long, default_value = "1")]
    seed: u64,

    /// Rank families by out-of-fold predictions instead of in-sample fit
    #[arg(long)]
    held_out: bool,

    /// Write the comparison table to this TSV file
    #[arg(long, value_name = "PATH")]
    comparison_out: Option<String>,

    /// Write every candidate's search score to this TSV file
    #[arg(long, value_name = "PATH")]
    cv_out: Option<String>,

    /// Write fitted curves over an evenly spaced budget grid to this TSV file
    #[arg(long, value_name = "PATH")]
    curves_out: Option<String>,

    /// Number of budget grid points in the curve export
    #[arg(long, default_value = "200")]
    grid_points: usize,
}

#[derive(Args)]
struct CleanArgs {
    /// Path to the movie CSV (TSV if the name ends in .tsv)
    data: String,

    /// Output path for the cleaned CSV
    #[arg(long)]
    output: String,

    /// Keep only rows with this rating
    #[arg(long)]
    rating: Option<String>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Select(args) => select_command(args),
        Commands::Clean(args) => clean_command(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn load_subgroup(path: &str, rating: Option<&str>) -> Result<Dataset, DataError> {
    println!("Loading movie data from: {path}");
    let dataset = load_dataset(path)?;
    let dataset = match rating {
        Some(rating) => {
            let subgroup = dataset.with_rating(rating);
            println!(
                "Restricted to rating '{rating}': {} of {} records",
                subgroup.len(),
                dataset.len()
            );
            subgroup
        }
        None => dataset,
    };
    if dataset.is_empty() {
        return Err(DataError::EmptyDataset);
    }
    Ok(dataset)
}

fn select_command(args: SelectArgs) -> Result<(), Box<dyn std::error::Error>> {
    let dataset = load_subgroup(&args.data, args.rating.as_deref())?;
    let observations = dataset.observations();
    println!("Fitting models on {} records", observations.len());

    let config = SelectionConfig {
        folds: args.folds as usize,
        seed: args.seed,
        ..SelectionConfig::default()
    };
    let selection = select_models(&observations, &config)?;
    let table = if args.held_out {
        println!("Ranking families by {}-fold out-of-fold predictions", config.folds);
        compare_held_out(&selection, &observations, &config)
    } else {
        compare(&selection, &observations)
    };

    println!("\n{}", render_search(&selection));
    println!("{}", render_comparison(&table));

    if let Some(path) = &args.comparison_out {
        write_comparison_tsv(&table, path)?;
        println!("Comparison table saved to: {path}");
    }
    if let Some(path) = &args.cv_out {
        write_search_tsv(&selection, path)?;
        println!("Search scores saved to: {path}");
    }
    if let Some(path) = &args.curves_out {
        write_curves_tsv(&selection, &observations, args.grid_points, path)?;
        println!("Fitted curves saved to: {path}");
    }

    Ok(())
}

fn clean_command(args: CleanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let dataset = load_subgroup(&args.data, args.rating.as_deref())?;
    dataset.write_csv(&args.output)?;
    println!("Cleaned dataset ({} records) saved to: {}", dataset.len(), args.output);
    Ok(())
}
