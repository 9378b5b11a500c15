//! Test fixtures and builders for the selection tests.
//!
//! Provides a synthetic budget/gross generator and a complete raw movie row,
//! reducing boilerplate across the unit tests.

use crate::data::{Observations, RawRecord};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Builder for synthetic `(budget, gross)` observations:
/// budget uniform on `[1e6, 2e8]`, `gross = 2·budget + curvature·budget² + ε`.
pub struct SyntheticDataBuilder {
    n_samples: usize,
    curvature: f64,
    noise_sd: f64,
    constant_budget: Option<f64>,
    seed: u64,
}

impl SyntheticDataBuilder {
    /// Create a new builder with defaults.
    pub fn new(n_samples: usize) -> Self {
        Self {
            n_samples,
            curvature: 0.0,
            noise_sd: 2.0e7,
            constant_budget: None,
            seed: 42,
        }
    }

    /// Add a quadratic term to the signal.
    pub fn quadratic(mut self, curvature: f64) -> Self {
        self.curvature = curvature;
        self
    }

    /// Set the standard deviation of the Gaussian noise.
    pub fn noise_sd(mut self, sd: f64) -> Self {
        self.noise_sd = sd;
        self
    }

    /// Give every observation the same budget.
    pub fn constant_budget(mut self, budget: f64) -> Self {
        self.constant_budget = Some(budget);
        self
    }

    /// Set the random seed for reproducibility.
    pub fn seed(mut self, s: u64) -> Self {
        self.seed = s;
        self
    }

    pub fn build(self) -> Observations {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let noise = Normal::new(0.0, self.noise_sd).expect("valid noise sd");

        let budget: Array1<f64> = (0..self.n_samples)
            .map(|_| {
                self.constant_budget
                    .unwrap_or_else(|| rng.gen_range(1.0e6..2.0e8))
            })
            .collect();
        let gross = budget.mapv(|b| 2.0 * b + self.curvature * b * b + noise.sample(&mut rng));

        Observations::new(budget, gross).expect("equal lengths")
    }
}

/// A complete raw row with the given budget, gross and rating.
pub fn raw_movie(budget: f64, gross: f64, rating: &str) -> RawRecord {
    let text = |v: &str| Some(v.to_string());
    RawRecord {
        budget: Some(budget.to_string()),
        company: text("Columbia Pictures"),
        country: text("United States"),
        director: text("Rob Reiner"),
        genre: text("Drama"),
        gross: Some(gross.to_string()),
        name: text("Stand by Me"),
        rating: text(rating),
        released: text("1986-08-22"),
        runtime: text("89"),
        score: text("8.1"),
        star: text("Wil Wheaton"),
        votes: text("299174"),
        writer: text("Stephen King"),
        year: text("1986"),
    }
}
