//! Binary classifiers compared by the benchmark
//!
//! Every learner works on a dense `samples x features` matrix and 0/1 labels
//! and returns the probability of class 1. The fixed set of learners is
//! enumerated by [`LearnerKind`], which also owns each learner's search space.

mod boosting;
mod error;
mod featureless;
mod forest;
mod knn;
mod logistic;
mod naive_bayes;
mod params;
mod scaling;
mod tree;

pub use boosting::GradientBoosting;
pub use error::{LearnerError, Result};
pub use featureless::Featureless;
pub use forest::RandomForest;
pub use knn::{KnnClassifier, KnnWeights};
pub use logistic::LogisticRegression;
pub use naive_bayes::GaussianNaiveBayes;
pub use params::{ParamDomain, ParamSet, ParamSpec, ParamValue, SearchSpace};
pub use scaling::Standardizer;
pub use tree::{ClassificationTree, RegressionTree};

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2};
use serde::Serialize;

/// Decision threshold applied to class-1 probabilities
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Common interface of all classifiers
pub trait Learner: Send + Sync {
    /// Fit on features `x` (samples x features) and 0/1 labels `y`
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Probability of class 1 for each row of `x`
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Hard 0/1 predictions at [`DECISION_THRESHOLD`]
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= DECISION_THRESHOLD { 1.0 } else { 0.0 }))
    }

    /// Model-native importance, normalized to sum to 1, if the model has one
    fn feature_importance(&self) -> Option<Array1<f64>> {
        None
    }
}

/// The fixed list of learners, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LearnerKind {
    Featureless,
    Logistic,
    Tree,
    Forest,
    Boosting,
    Knn,
    NaiveBayes,
}

impl LearnerKind {
    pub const ALL: [LearnerKind; 7] = [
        LearnerKind::Featureless,
        LearnerKind::Logistic,
        LearnerKind::Tree,
        LearnerKind::Forest,
        LearnerKind::Boosting,
        LearnerKind::Knn,
        LearnerKind::NaiveBayes,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LearnerKind::Featureless => "featureless",
            LearnerKind::Logistic => "logistic",
            LearnerKind::Tree => "tree",
            LearnerKind::Forest => "forest",
            LearnerKind::Boosting => "boosting",
            LearnerKind::Knn => "knn",
            LearnerKind::NaiveBayes => "naive_bayes",
        }
    }

    /// The featureless learner only serves as a reference point
    pub fn is_baseline(&self) -> bool {
        matches!(self, LearnerKind::Featureless)
    }

    pub fn search_space(&self) -> SearchSpace {
        match self {
            LearnerKind::Featureless => SearchSpace::new(),
            LearnerKind::Logistic => SearchSpace::new().log_float("alpha", 1e-4, 10.0),
            LearnerKind::Tree => SearchSpace::new()
                .int("max_depth", 1, 10)
                .int("min_samples_leaf", 1, 10),
            LearnerKind::Forest => SearchSpace::new()
                .int("n_trees", 50, 300)
                .float("max_features", 0.05, 0.8)
                .int("min_samples_leaf", 1, 10),
            LearnerKind::Boosting => SearchSpace::new()
                .int("n_rounds", 20, 200)
                .log_float("learning_rate", 0.01, 0.3)
                .int("max_depth", 1, 6)
                .float("subsample", 0.5, 1.0),
            LearnerKind::Knn => SearchSpace::new()
                .int("k", 1, 25)
                .categorical("weights", &["uniform", "distance"]),
            LearnerKind::NaiveBayes => SearchSpace::new().log_float("var_smoothing", 1e-9, 1e-1),
        }
    }

    /// Construct an unfitted learner from a parameter set
    pub fn build(&self, params: &ParamSet, seed: u64) -> Result<Box<dyn Learner>> {
        let learner: Box<dyn Learner> = match self {
            LearnerKind::Featureless => Box::new(Featureless::new()),
            LearnerKind::Logistic => {
                Box::new(LogisticRegression::new().with_alpha(params.float_or("alpha", 0.01)?))
            }
            LearnerKind::Tree => Box::new(
                ClassificationTree::new()
                    .with_max_depth(positive_usize(params, "max_depth", 5)?)
                    .with_min_samples_leaf(positive_usize(params, "min_samples_leaf", 1)?),
            ),
            LearnerKind::Forest => Box::new(
                RandomForest::new(positive_usize(params, "n_trees", 100)?)
                    .with_max_features(params.float_or("max_features", 0.3)?)
                    .with_min_samples_leaf(positive_usize(params, "min_samples_leaf", 1)?)
                    .with_seed(seed),
            ),
            LearnerKind::Boosting => Box::new(
                GradientBoosting::new(positive_usize(params, "n_rounds", 100)?)
                    .with_learning_rate(params.float_or("learning_rate", 0.1)?)
                    .with_max_depth(positive_usize(params, "max_depth", 3)?)
                    .with_subsample(params.float_or("subsample", 1.0)?)
                    .with_seed(seed),
            ),
            LearnerKind::Knn => {
                let weights: KnnWeights = params
                    .choice_or("weights", "uniform")?
                    .parse()
                    .map_err(|reason| LearnerError::InvalidParameter {
                        name: "weights".to_string(),
                        reason,
                    })?;
                Box::new(KnnClassifier::new(positive_usize(params, "k", 5)?).with_weights(weights))
            }
            LearnerKind::NaiveBayes => Box::new(
                GaussianNaiveBayes::new()
                    .with_var_smoothing(params.float_or("var_smoothing", 1e-9)?),
            ),
        };
        Ok(learner)
    }
}

impl fmt::Display for LearnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for LearnerKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "featureless" | "baseline" => Ok(LearnerKind::Featureless),
            "logistic" | "logreg" => Ok(LearnerKind::Logistic),
            "tree" | "cart" => Ok(LearnerKind::Tree),
            "forest" | "rf" | "random_forest" => Ok(LearnerKind::Forest),
            "boosting" | "gbm" | "gradient_boosting" => Ok(LearnerKind::Boosting),
            "knn" => Ok(LearnerKind::Knn),
            "naive_bayes" | "nb" => Ok(LearnerKind::NaiveBayes),
            _ => Err(format!(
                "Unknown model: '{}'. Use one of: {}",
                s,
                LearnerKind::ALL
                    .iter()
                    .map(|k| k.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

fn positive_usize(params: &ParamSet, name: &str, default: i64) -> Result<usize> {
    let value = params.int_or(name, default)?;
    if value < 1 {
        return Err(LearnerError::InvalidParameter {
            name: name.to_string(),
            reason: format!("must be >= 1, got {}", value),
        });
    }
    Ok(value as usize)
}

/// Validate a training set: matching lengths, at least one row, both classes present
pub(crate) fn check_training_data(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(LearnerError::ShapeMismatch {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(LearnerError::EmptyInput(format!(
            "training matrix is {}x{}",
            x.nrows(),
            x.ncols()
        )));
    }
    let first = y[0];
    if y.iter().all(|&v| v == first) {
        return Err(LearnerError::SingleClass(first));
    }
    Ok(())
}

/// Validate prediction input against the fitted feature count
pub(crate) fn check_prediction_data(x: &Array2<f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(LearnerError::ShapeMismatch {
            expected: format!("{} features", n_features),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}

/// Reject predictions containing NaN or infinite probabilities
pub fn check_probabilities(proba: &Array1<f64>) -> Result<()> {
    let count = proba.iter().filter(|p| !p.is_finite()).count();
    if count > 0 {
        return Err(LearnerError::NonFiniteOutput {
            count,
            total: proba.len(),
        });
    }
    Ok(())
}

/// Normalize a non-negative vector to sum 1; all-zero stays all-zero
pub(crate) fn normalize_importance(mut values: Array1<f64>) -> Array1<f64> {
    let total: f64 = values.sum();
    if total > 0.0 {
        values.mapv_inplace(|v| v / total);
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_check_probabilities_counts_non_finite() {
        assert!(check_probabilities(&array![0.1, 0.9]).is_ok());
        match check_probabilities(&array![0.1, f64::NAN, f64::INFINITY]) {
            Err(LearnerError::NonFiniteOutput { count, total }) => {
                assert_eq!(count, 2);
                assert_eq!(total, 3);
            }
            other => panic!("expected NonFiniteOutput, got {:?}", other),
        }
    }

    #[test]
    fn test_kind_roundtrip_names() {
        for kind in LearnerKind::ALL {
            assert_eq!(kind.name().parse::<LearnerKind>().unwrap(), kind);
        }
        assert_eq!("RF".parse::<LearnerKind>().unwrap(), LearnerKind::Forest);
        assert!("svm".parse::<LearnerKind>().is_err());
    }

    #[test]
    fn test_only_featureless_has_empty_space() {
        for kind in LearnerKind::ALL {
            assert_eq!(kind.search_space().is_empty(), kind.is_baseline());
        }
    }

    #[test]
    fn test_every_kind_builds_from_sampled_params() {
        use rand::SeedableRng;
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(5);
        let x = array![[0.0, 1.0], [0.2, 0.9], [1.0, 0.0], [0.9, 0.1], [0.1, 0.8], [0.8, 0.3]];
        let y = array![0.0, 0.0, 1.0, 1.0, 0.0, 1.0];

        for kind in LearnerKind::ALL {
            let params = kind.search_space().sample(&mut rng);
            let mut learner = kind.build(&params, 1).unwrap();
            learner.fit(&x, &y).unwrap();
            let proba = learner.predict_proba(&x).unwrap();
            assert_eq!(proba.len(), 6);
            assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)), "{}: {:?}", kind, proba);
        }
    }

    #[test]
    fn test_build_rejects_non_positive_counts() {
        let params = ParamSet::new().with("k", ParamValue::Int(0));
        assert!(LearnerKind::Knn.build(&params, 0).is_err());
    }

    #[test]
    fn test_check_training_data_rejects_single_class() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0, 1.0];
        assert!(matches!(
            check_training_data(&x, &y),
            Err(LearnerError::SingleClass(_))
        ));
    }
}
