//! Random forest of Gini trees grown on bootstrap samples

use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use super::error::{LearnerError, Result};
use super::tree::ClassificationTree;
use super::{check_prediction_data, check_training_data, normalize_importance, Learner};

#[derive(Debug, Clone)]
pub struct RandomForest {
    pub n_trees: usize,
    /// Fraction of features considered at each split
    pub max_features: f64,
    pub min_samples_leaf: usize,
    pub max_depth: Option<usize>,
    pub seed: u64,
    trees: Vec<ClassificationTree>,
    n_features: usize,
}

impl RandomForest {
    pub fn new(n_trees: usize) -> Self {
        Self {
            n_trees,
            max_features: 0.3,
            min_samples_leaf: 1,
            max_depth: None,
            seed: 42,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    pub fn with_max_features(mut self, fraction: f64) -> Self {
        self.max_features = fraction;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn n_fitted_trees(&self) -> usize {
        self.trees.len()
    }

    fn features_per_split(&self, n_features: usize) -> usize {
        ((n_features as f64 * self.max_features).ceil() as usize).clamp(1, n_features)
    }
}

impl Learner for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        if !(self.max_features > 0.0 && self.max_features <= 1.0) {
            return Err(LearnerError::InvalidParameter {
                name: "max_features".to_string(),
                reason: format!("must be in (0, 1], got {}", self.max_features),
            });
        }

        let n_samples = x.nrows();
        let n_features = x.ncols();
        let m = self.features_per_split(n_features);
        let max_depth = self.max_depth.unwrap_or(usize::MAX);
        let min_samples_leaf = self.min_samples_leaf;
        let base_seed = self.seed;

        let trees: Vec<ClassificationTree> = (0..self.n_trees)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));
                let bootstrap: Vec<usize> = (0..n_samples)
                    .map(|_| rng.gen_range(0..n_samples))
                    .collect();

                let mut tree = ClassificationTree::new()
                    .with_max_depth(max_depth)
                    .with_min_samples_leaf(min_samples_leaf)
                    .with_max_features(Some(m));
                tree.fit_indices(x, y, &bootstrap, &mut rng);
                tree
            })
            .collect();

        self.trees = trees;
        self.n_features = n_features;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(LearnerError::NotFitted);
        }
        check_prediction_data(x, self.n_features)?;

        let n_trees = self.trees.len() as f64;
        Ok(x.rows()
            .into_iter()
            .map(|row| {
                self.trees
                    .iter()
                    .filter_map(|t| t.predict_row(row))
                    .sum::<f64>()
                    / n_trees
            })
            .collect())
    }

    fn feature_importance(&self) -> Option<Array1<f64>> {
        if self.trees.is_empty() {
            return None;
        }
        let mut total = Array1::<f64>::zeros(self.n_features);
        for tree in &self.trees {
            let imp = normalize_importance(Array1::from_vec(tree.raw_importances().to_vec()));
            total += &imp;
        }
        Some(normalize_importance(total))
    }
}
