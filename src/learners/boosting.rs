//! Gradient boosting on the log-odds with shallow regression trees

use ndarray::{Array1, Array2};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::error::{LearnerError, Result};
use super::tree::RegressionTree;
use super::{check_prediction_data, check_training_data, normalize_importance, Learner};

#[derive(Debug, Clone)]
pub struct GradientBoosting {
    pub n_rounds: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Fraction of rows drawn (without replacement) for each round
    pub subsample: f64,
    pub min_samples_leaf: usize,
    pub seed: u64,
    init: f64,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

impl GradientBoosting {
    pub fn new(n_rounds: usize) -> Self {
        Self {
            n_rounds,
            learning_rate: 0.1,
            max_depth: 3,
            subsample: 1.0,
            min_samples_leaf: 1,
            seed: 42,
            init: 0.0,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_subsample(mut self, fraction: f64) -> Self {
        self.subsample = fraction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn raw_scores(&self, x: &Array2<f64>) -> Array1<f64> {
        x.rows()
            .into_iter()
            .map(|row| {
                self.init
                    + self
                        .trees
                        .iter()
                        .map(|t| self.learning_rate * t.predict_row(row))
                        .sum::<f64>()
            })
            .collect()
    }
}

impl Learner for GradientBoosting {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(LearnerError::InvalidParameter {
                name: "subsample".to_string(),
                reason: format!("must be in (0, 1], got {}", self.subsample),
            });
        }
        if !(self.learning_rate > 0.0) {
            return Err(LearnerError::InvalidParameter {
                name: "learning_rate".to_string(),
                reason: format!("must be positive, got {}", self.learning_rate),
            });
        }

        let n = x.nrows();
        let prior = (y.sum() / n as f64).clamp(1e-6, 1.0 - 1e-6);
        self.init = (prior / (1.0 - prior)).ln();
        self.trees.clear();
        self.n_features = x.ncols();

        let rows_per_round = ((n as f64 * self.subsample).ceil() as usize).clamp(1, n);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut scores = Array1::from_elem(n, self.init);

        for _ in 0..self.n_rounds {
            let proba = scores.mapv(sigmoid);
            let residuals: Vec<f64> = y.iter().zip(proba.iter()).map(|(t, p)| t - p).collect();
            let hessians: Vec<f64> = proba.iter().map(|p| p * (1.0 - p)).collect();

            let rows: Vec<usize> = if rows_per_round < n {
                sample(&mut rng, n, rows_per_round).into_vec()
            } else {
                (0..n).collect()
            };

            let mut tree = RegressionTree::new(self.max_depth, self.min_samples_leaf);
            tree.fit_residuals(x, &residuals, &hessians, &rows, &mut rng);

            for (i, row) in x.rows().into_iter().enumerate() {
                scores[i] += self.learning_rate * tree.predict_row(row);
            }
            self.trees.push(tree);
        }
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(LearnerError::NotFitted);
        }
        check_prediction_data(x, self.n_features)?;
        Ok(self.raw_scores(x).mapv(sigmoid))
    }

    fn feature_importance(&self) -> Option<Array1<f64>> {
        if self.trees.is_empty() {
            return None;
        }
        let mut total = Array1::<f64>::zeros(self.n_features);
        for tree in &self.trees {
            for (j, gain) in tree.raw_importances().iter().enumerate() {
                total[j] += gain;
            }
        }
        Some(normalize_importance(total))
    }
}
