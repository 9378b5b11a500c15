use std::fs;
use std::process::Command;

use tempfile::tempdir;

const HEADER: &str =
    "budget,company,country,director,genre,gross,name,rating,released,runtime,score,star,votes,writer,year";

fn movie_csv(rows: usize) -> String {
    let mut csv = format!("{HEADER}\n");
    for i in 0..rows {
        let budget = 2.0e6 + 3.1e6 * i as f64;
        // Deterministic wiggle so the response is not an exact line.
        let gross = 2.2 * budget + 4.0e6 * ((i * 7 % 11) as f64 - 5.0);
        let rating = if i % 3 == 0 { "PG-13" } else { "R" };
        csv.push_str(&format!(
            "{budget},Studio {i},United States,Director {i},Drama,{gross},Movie {i},{rating},1999,100,6.5,Star {i},1200,Writer {i},1999\n"
        ));
    }
    // An incomplete row that cleaning removes.
    csv.push_str("0,Studio,United States,Director,Drama,1000,Broken,R,1999,100,6.5,Star,1200,Writer,1999\n");
    csv
}

#[test]
fn select_writes_every_requested_export() {
    let tmp = tempdir().expect("temporary directory");
    let data_path = tmp.path().join("movies.csv");
    fs::write(&data_path, movie_csv(40)).expect("write movie data");

    let exe = env!("CARGO_BIN_EXE_boxoffice");
    let output = Command::new(exe)
        .current_dir(tmp.path())
        .args([
            "select",
            data_path.to_str().expect("path str"),
            "--folds",
            "5",
            "--comparison-out",
            "comparison.tsv",
            "--cv-out",
            "search.tsv",
            "--curves-out",
            "curves.tsv",
            "--grid-points",
            "30",
        ])
        .output()
        .expect("run boxoffice cli");

    assert!(output.status.success(), "CLI failed: {output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Fitting models on 40 records"), "{stdout}");
    assert!(stdout.contains("smoothing-spline"), "{stdout}");

    let comparison = fs::read_to_string(tmp.path().join("comparison.tsv")).expect("comparison");
    assert_eq!(comparison.lines().count(), 7);
    let curves = fs::read_to_string(tmp.path().join("curves.tsv")).expect("curves");
    assert_eq!(curves.lines().count(), 31);
    assert!(tmp.path().join("search.tsv").exists(), "search.tsv missing");
}

#[test]
fn clean_exports_the_rating_subgroup() {
    let tmp = tempdir().expect("temporary directory");
    let data_path = tmp.path().join("movies.csv");
    fs::write(&data_path, movie_csv(12)).expect("write movie data");

    let exe = env!("CARGO_BIN_EXE_boxoffice");
    let status = Command::new(exe)
        .current_dir(tmp.path())
        .args([
            "clean",
            data_path.to_str().expect("path str"),
            "--output",
            "clean.csv",
            "--rating",
            "pg-13",
        ])
        .status()
        .expect("run boxoffice cli");

    assert!(status.success(), "CLI exited with status {status:?}");
    let cleaned = fs::read_to_string(tmp.path().join("clean.csv")).expect("clean.csv");
    // header + rows 0, 3, 6, 9
    assert_eq!(cleaned.lines().count(), 5);
    assert!(cleaned.lines().next().unwrap().starts_with("budget,company"));
}

#[test]
fn missing_file_exits_with_an_error() {
    let exe = env!("CARGO_BIN_EXE_boxoffice");
    let output = Command::new(exe)
        .args(["select", "does-not-exist.csv"])
        .output()
        .expect("run boxoffice cli");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}
