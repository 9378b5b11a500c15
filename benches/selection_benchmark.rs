// ========================================================================================
//
//                 BOXOFFICE MODEL SELECTION BENCHMARK
//
// ========================================================================================
//
// Measures the cost of a family's hyperparameter search as the number of movies grows.
// Cross-validated families refit once per fold and candidate; local regression refits
// once per evaluation point, so the two scale very differently.
//
// ========================================================================================

use boxoffice::data::Observations;
use boxoffice::family::Family;
use boxoffice::pipeline::{SelectionConfig, search_family};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Dataset sizes to test.
const SAMPLE_SIZES: [usize; 3] = [200, 1_000, 3_000];

fn synthetic_movies(n: usize) -> Observations {
    let mut rng = StdRng::seed_from_u64(2024);
    let noise = Normal::new(0.0, 3.0e7).unwrap();
    let budget: Array1<f64> = (0..n).map(|_| rng.gen_range(1.0e6..2.5e8)).collect();
    let gross = budget.mapv(|b| 1.8 * b + 4.0e-10 * b * b + noise.sample(&mut rng));
    Observations::new(budget, gross).unwrap()
}

fn bench_family_search(c: &mut Criterion) {
    let config = SelectionConfig::default();
    let mut group = c.benchmark_group("family_search");
    group.sample_size(10);

    for &n in &SAMPLE_SIZES {
        let obs = synthetic_movies(n);
        for family in [
            Family::Polynomial,
            Family::NaturalSpline,
            Family::SmoothingSpline,
            Family::Local,
        ] {
            group.bench_with_input(BenchmarkId::new(family.name(), n), &obs, |b, obs| {
                b.iter(|| search_family(black_box(family), black_box(obs), &config))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_family_search);
criterion_main!(benches);
