//! CART trees: a Gini classification tree and a Newton-leaf regression tree
//!
//! Both trees share one grower. Split candidates are found by sorting each
//! feature once per node and sweeping running sums, so a node costs
//! O(n log n) per candidate feature. Duplicate row indices are allowed, which
//! lets the forest grow trees on bootstrap samples without copying rows.

use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::error::{LearnerError, Result};
use super::{check_prediction_data, check_training_data, normalize_importance, Learner};

/// Minimum impurity decrease for a split to be kept
const MIN_GAIN: f64 = 1e-12;

/// Bound on a single Newton leaf step, in log-odds
const MAX_NEWTON_STEP: f64 = 4.0;

#[derive(Debug, Clone)]
pub(crate) enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn predict(&self, row: ArrayView1<f64>) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Criterion {
    /// Binary Gini impurity on 0/1 targets
    Gini,
    /// Sum-of-squares reduction on real-valued targets
    Variance,
}

struct Grower<'a> {
    x: &'a Array2<f64>,
    target: &'a [f64],
    /// Second-order weights for Newton leaf values (regression only)
    hessian: Option<&'a [f64]>,
    criterion: Criterion,
    max_depth: usize,
    min_samples_leaf: usize,
    max_features: Option<usize>,
    importances: Vec<f64>,
}

fn gini(sum: f64, n: f64) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    let p = sum / n;
    2.0 * p * (1.0 - p)
}

impl<'a> Grower<'a> {
    fn leaf(&self, indices: &[usize]) -> TreeNode {
        let sum: f64 = indices.iter().map(|&i| self.target[i]).sum();
        let n = indices.len();
        let value = match (self.criterion, self.hessian) {
            (Criterion::Variance, Some(h)) => {
                let h_sum: f64 = indices.iter().map(|&i| h[i]).sum();
                (sum / h_sum.max(1e-12)).clamp(-MAX_NEWTON_STEP, MAX_NEWTON_STEP)
            }
            _ => {
                if n == 0 {
                    0.0
                } else {
                    sum / n as f64
                }
            }
        };
        TreeNode::Leaf { value }
    }

    fn gain(&self, n_l: f64, s_l: f64, n_r: f64, s_r: f64) -> f64 {
        let n = n_l + n_r;
        let s = s_l + s_r;
        match self.criterion {
            Criterion::Gini => gini(s, n) - (n_l * gini(s_l, n_l) + n_r * gini(s_r, n_r)) / n,
            Criterion::Variance => (s_l * s_l / n_l + s_r * s_r / n_r - s * s / n) / n,
        }
    }

    /// Best (threshold, gain) for one feature over the node's rows
    fn best_split_on(&self, indices: &[usize], feature: usize) -> Option<(f64, f64)> {
        let mut pairs: Vec<(f64, f64)> = indices
            .iter()
            .map(|&i| (self.x[[i, feature]], self.target[i]))
            .collect();
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let n = pairs.len();
        let total: f64 = pairs.iter().map(|(_, t)| t).sum();
        let mut left_sum = 0.0;
        let mut best: Option<(f64, f64)> = None;

        for k in 0..n.saturating_sub(1) {
            left_sum += pairs[k].1;
            let n_l = k + 1;
            let n_r = n - n_l;
            if pairs[k].0 == pairs[k + 1].0 {
                continue;
            }
            if n_l < self.min_samples_leaf || n_r < self.min_samples_leaf {
                continue;
            }
            let gain = self.gain(n_l as f64, left_sum, n_r as f64, total - left_sum);
            if best.map_or(true, |(_, g)| gain > g) {
                best = Some(((pairs[k].0 + pairs[k + 1].0) / 2.0, gain));
            }
        }
        best
    }

    fn candidate_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        let n_features = self.x.ncols();
        match self.max_features {
            Some(m) if m < n_features => sample(rng, n_features, m.max(1)).into_vec(),
            _ => (0..n_features).collect(),
        }
    }

    fn is_pure(&self, indices: &[usize]) -> bool {
        let first = self.target[indices[0]];
        indices.iter().all(|&i| self.target[i] == first)
    }

    fn grow(&mut self, indices: &[usize], depth: usize, rng: &mut ChaCha8Rng) -> TreeNode {
        let n = indices.len();
        if n == 0
            || depth >= self.max_depth
            || n < 2 * self.min_samples_leaf
            || (self.criterion == Criterion::Gini && self.is_pure(indices))
        {
            return self.leaf(indices);
        }

        let mut best: Option<(usize, f64, f64)> = None;
        for feature in self.candidate_features(rng) {
            if let Some((threshold, gain)) = self.best_split_on(indices, feature) {
                if best.map_or(true, |(_, _, g)| gain > g) {
                    best = Some((feature, threshold, gain));
                }
            }
        }

        let (feature, threshold, gain) = match best {
            Some(b) if b.2 > MIN_GAIN => b,
            _ => return self.leaf(indices),
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.x[[i, feature]] <= threshold);

        self.importances[feature] += n as f64 * gain;

        let left = Box::new(self.grow(&left_idx, depth + 1, rng));
        let right = Box::new(self.grow(&right_idx, depth + 1, rng));
        TreeNode::Split {
            feature,
            threshold,
            left,
            right,
        }
    }
}

/// Gini classification tree; leaves hold the class-1 fraction
#[derive(Debug, Clone)]
pub struct ClassificationTree {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` means all
    pub max_features: Option<usize>,
    pub seed: u64,
    root: Option<TreeNode>,
    n_features: usize,
    importances: Vec<f64>,
}

impl Default for ClassificationTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassificationTree {
    pub fn new() -> Self {
        Self {
            max_depth: 5,
            min_samples_leaf: 1,
            max_features: None,
            seed: 0,
            root: None,
            n_features: 0,
            importances: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Grow the tree on the given (possibly repeated) row indices
    pub(crate) fn fit_indices(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) {
        let target: Vec<f64> = y.to_vec();
        let mut grower = Grower {
            x,
            target: &target,
            hessian: None,
            criterion: Criterion::Gini,
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features,
            importances: vec![0.0; x.ncols()],
        };
        let root = grower.grow(indices, 0, rng);
        self.root = Some(root);
        self.n_features = x.ncols();
        self.importances = grower.importances;
    }

    pub(crate) fn predict_row(&self, row: ArrayView1<f64>) -> Option<f64> {
        self.root.as_ref().map(|r| r.predict(row))
    }

    pub(crate) fn raw_importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn depth(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::depth)
    }

    pub fn n_leaves(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::n_leaves)
    }
}

impl Learner for ClassificationTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        let indices: Vec<usize> = (0..x.nrows()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.fit_indices(x, y, &indices, &mut rng);
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(LearnerError::NotFitted)?;
        check_prediction_data(x, self.n_features)?;
        Ok(x.rows().into_iter().map(|row| root.predict(row)).collect())
    }

    fn feature_importance(&self) -> Option<Array1<f64>> {
        self.root.as_ref()?;
        Some(normalize_importance(Array1::from_vec(self.importances.clone())))
    }
}

/// Regression tree fitted to gradient residuals, with Newton-step leaves
#[derive(Debug, Clone)]
pub struct RegressionTree {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    root: Option<TreeNode>,
    importances: Vec<f64>,
}

impl RegressionTree {
    pub fn new(max_depth: usize, min_samples_leaf: usize) -> Self {
        Self {
            max_depth,
            min_samples_leaf: min_samples_leaf.max(1),
            root: None,
            importances: Vec::new(),
        }
    }

    /// Fit on residuals (indexed by row) restricted to `indices`
    pub(crate) fn fit_residuals(
        &mut self,
        x: &Array2<f64>,
        residuals: &[f64],
        hessians: &[f64],
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) {
        let mut grower = Grower {
            x,
            target: residuals,
            hessian: Some(hessians),
            criterion: Criterion::Variance,
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            max_features: None,
            importances: vec![0.0; x.ncols()],
        };
        self.root = Some(grower.grow(indices, 0, rng));
        self.importances = grower.importances;
    }

    pub(crate) fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        self.root.as_ref().map_or(0.0, |r| r.predict(row))
    }

    pub(crate) fn raw_importances(&self) -> &[f64] {
        &self.importances
    }
}
