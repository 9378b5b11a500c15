use boxoffice::compare::{compare, compare_held_out, total_sum_of_squares};
use boxoffice::data::{DataError, Observations, RawRecord, prepare};
use boxoffice::family::{Family, Hyperparameter};
use boxoffice::pipeline::{SelectionConfig, SelectionError, select_models};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

const NOISE_SD: f64 = 1.0e7;

/// `gross = 2·budget + ε` with budgets uniform on `[1e6, 2e8]`.
fn linear_movies(n: usize, seed: u64) -> Observations {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, NOISE_SD).unwrap();
    let budget: Array1<f64> = (0..n).map(|_| rng.gen_range(1.0e6..2.0e8)).collect();
    let gross = budget.mapv(|b| 2.0 * b + noise.sample(&mut rng));
    Observations::new(budget, gross).unwrap()
}

fn movie(budget: f64, gross: f64, rating: &str) -> RawRecord {
    let text = |v: &str| Some(v.to_string());
    RawRecord {
        budget: Some(budget.to_string()),
        company: text("Paramount Pictures"),
        country: text("United States"),
        director: text("John Hughes"),
        genre: text("Comedy"),
        gross: Some(gross.to_string()),
        name: text("Ferris Bueller's Day Off"),
        rating: text(rating),
        released: text("1986-06-11"),
        runtime: text("103"),
        score: text("7.8"),
        star: text("Matthew Broderick"),
        votes: text("352000"),
        writer: text("John Hughes"),
        year: text("1986"),
    }
}

#[test]
fn linear_truth_is_recovered_by_the_linear_family() {
    let obs = linear_movies(100, 7);
    let selection = select_models(&obs, &SelectionConfig::default()).unwrap();
    assert_eq!(selection.selected().count(), Family::ALL.len());

    let table = compare(&selection, &obs);
    let linear = table
        .rows
        .iter()
        .find(|row| row.family == Family::Linear)
        .unwrap();
    let relative = (linear.rmse - NOISE_SD).abs() / NOISE_SD;
    assert!(relative < 0.25, "linear RMSE {} vs noise {NOISE_SD}", linear.rmse);
    assert!(linear.r_squared > 0.9, "R² {}", linear.r_squared);

    // Piecewise-constant steps cannot follow a steep trend.
    let step_rank = table.rank_of(Family::Step).unwrap();
    assert!(table.rank_of(Family::Linear).unwrap() < step_rank);
}

#[test]
fn linear_truth_ranks_linear_near_the_top_on_held_out_predictions() {
    let obs = linear_movies(100, 7);
    let config = SelectionConfig::default();
    let selection = select_models(&obs, &config).unwrap();
    let table = compare_held_out(&selection, &obs, &config);

    assert!(table.excluded.is_empty(), "{:?}", table.excluded);
    let best = table.best().unwrap().rmse;
    let linear = table
        .rows
        .iter()
        .find(|row| row.family == Family::Linear)
        .unwrap();
    assert!(linear.rmse <= best * 1.05, "linear {} vs best {best}", linear.rmse);
}

#[test]
fn five_rows_with_ten_folds_is_insufficient_for_cross_validated_families() {
    let obs = linear_movies(5, 3);
    let selection = select_models(&obs, &SelectionConfig::default()).unwrap();
    for family in [Family::Polynomial, Family::Step, Family::NaturalSpline] {
        let outcome = selection.get(family).unwrap();
        assert!(
            matches!(
                outcome.result,
                Err(SelectionError::InsufficientData { rows: 5, folds: 10 })
            ),
            "{family}: {:?}",
            outcome.result
        );
    }
}

#[test]
fn small_rating_subgroup_keeps_the_families_that_need_no_folds() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut raw = Vec::new();
    for i in 0..8 {
        let budget = 5.0e6 * (i + 1) as f64;
        raw.push(movie(budget, 2.5 * budget + rng.gen_range(-1.0e6..1.0e6), "G"));
    }
    for _ in 0..40 {
        let budget = rng.gen_range(1.0e6..2.0e8);
        raw.push(movie(budget, 2.0 * budget, "R"));
    }
    // Incomplete rows never reach the subgroup.
    raw.push(RawRecord {
        gross: None,
        ..movie(1.0e7, 0.0, "G")
    });

    let subgroup = prepare(&raw).with_rating("G");
    assert_eq!(subgroup.len(), 8);
    let obs = subgroup.observations();

    let selection = select_models(&obs, &SelectionConfig::default()).unwrap();
    for family in [Family::Polynomial, Family::Step, Family::NaturalSpline] {
        assert!(matches!(
            selection.get(family).unwrap().result,
            Err(SelectionError::InsufficientData { rows: 8, folds: 10 })
        ));
    }
    for family in [Family::Linear, Family::SmoothingSpline, Family::Local] {
        assert!(selection.get(family).unwrap().result.is_ok(), "{family}");
    }

    let table = compare(&selection, &obs);
    assert_eq!(table.rows.len(), 3);
    assert_eq!(table.excluded.len(), 3);
}

#[test]
fn repeated_runs_select_identical_models() {
    let obs = linear_movies(60, 21);
    let config = SelectionConfig {
        seed: 99,
        ..SelectionConfig::default()
    };
    let first = select_models(&obs, &config).unwrap();
    let second = select_models(&obs, &config).unwrap();

    let chosen = |selection: &boxoffice::pipeline::Selection| {
        selection
            .selected()
            .map(|s| (s.family, s.hyperparameter))
            .collect::<Vec<(Family, Option<Hyperparameter>)>>()
    };
    assert_eq!(chosen(&first), chosen(&second));
    assert_eq!(compare(&first, &obs), compare(&second, &obs));
}

#[test]
fn every_selected_model_predicts_at_every_training_budget() {
    let obs = linear_movies(50, 5);
    let selection = select_models(&obs, &SelectionConfig::default()).unwrap();
    for selected in selection.selected() {
        let predicted = selected.model.predict_many(obs.budget.view()).unwrap();
        assert_eq!(predicted.len(), obs.len());
        assert!(
            predicted.iter().all(|p| p.is_finite()),
            "{} produced a non-finite prediction",
            selected.family
        );
        assert!(selected.model.predict(obs.budget[0]).unwrap().is_finite());
    }
}

#[test]
fn r_squared_agrees_with_rmse_for_every_row() {
    let obs = linear_movies(80, 13);
    let selection = select_models(&obs, &SelectionConfig::default()).unwrap();
    let table = compare(&selection, &obs);
    let tss = total_sum_of_squares(obs.gross.view());
    let n = obs.len() as f64;
    for row in &table.rows {
        let expected = 1.0 - row.rmse * row.rmse * n / tss;
        assert!(
            (row.r_squared - expected).abs() < 1e-9,
            "{}: {} vs {expected}",
            row.family,
            row.r_squared
        );
    }
    for pair in table.rows.windows(2) {
        assert!(pair[0].rmse <= pair[1].rmse);
    }
}

#[test]
fn preparing_a_prepared_dataset_changes_nothing() {
    let raw = vec![
        movie(1.0e7, 3.0e7, "PG"),
        movie(0.0, 3.0e7, "PG"),
        movie(2.0e7, 5.0e7, "Not Rated"),
        RawRecord {
            director: Some("  N/A ".to_string()),
            ..movie(3.0e7, 4.0e7, "R")
        },
        movie(4.0e7, 9.0e7, "R"),
    ];
    let once = prepare(&raw);
    assert_eq!(once.len(), 2);
    let twice = prepare(&once.to_raw());
    assert_eq!(once, twice);
}

#[test]
fn empty_input_is_rejected() {
    let obs = Observations::new(Array1::zeros(0), Array1::zeros(0)).unwrap();
    assert!(matches!(
        select_models(&obs, &SelectionConfig::default()),
        Err(DataError::EmptyDataset)
    ));
}
