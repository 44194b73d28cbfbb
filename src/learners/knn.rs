//! k-nearest-neighbour classifier on standardized features

use std::str::FromStr;

use ndarray::{Array1, Array2, ArrayView1};

use super::error::{LearnerError, Result};
use super::scaling::Standardizer;
use super::{check_prediction_data, check_training_data, Learner};

/// How neighbour votes are weighted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KnnWeights {
    #[default]
    Uniform,
    /// Inverse Euclidean distance; exact matches take all the weight
    Distance,
}

impl FromStr for KnnWeights {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uniform" => Ok(KnnWeights::Uniform),
            "distance" => Ok(KnnWeights::Distance),
            _ => Err(format!("Unknown weighting: '{}'. Use 'uniform' or 'distance'.", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KnnClassifier {
    pub k: usize,
    pub weights: KnnWeights,
    scaler: Option<Standardizer>,
    train_x: Array2<f64>,
    train_y: Array1<f64>,
}

impl KnnClassifier {
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            weights: KnnWeights::Uniform,
            scaler: None,
            train_x: Array2::zeros((0, 0)),
            train_y: Array1::zeros(0),
        }
    }

    pub fn with_weights(mut self, weights: KnnWeights) -> Self {
        self.weights = weights;
        self
    }

    fn predict_one(&self, query: ArrayView1<f64>) -> f64 {
        let mut dists: Vec<(f64, f64)> = self
            .train_x
            .rows()
            .into_iter()
            .zip(self.train_y.iter())
            .map(|(row, &label)| {
                let d2: f64 = row
                    .iter()
                    .zip(query.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                (d2.sqrt(), label)
            })
            .collect();

        let k = self.k.min(dists.len());
        let cmp = |a: &(f64, f64), b: &(f64, f64)| {
            a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal)
        };
        if k < dists.len() {
            dists.select_nth_unstable_by(k - 1, cmp);
            dists.truncate(k);
        }

        match self.weights {
            KnnWeights::Uniform => dists.iter().map(|(_, l)| l).sum::<f64>() / k as f64,
            KnnWeights::Distance => {
                let exact: Vec<f64> = dists
                    .iter()
                    .filter(|(d, _)| *d == 0.0)
                    .map(|(_, l)| *l)
                    .collect();
                if !exact.is_empty() {
                    return exact.iter().sum::<f64>() / exact.len() as f64;
                }
                let (num, den) = dists
                    .iter()
                    .fold((0.0, 0.0), |(num, den), (d, l)| (num + l / d, den + 1.0 / d));
                num / den
            }
        }
    }
}

impl Learner for KnnClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        let scaler = Standardizer::fit(x);
        self.train_x = scaler.transform(x);
        self.train_y = y.clone();
        self.scaler = Some(scaler);
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let scaler = self.scaler.as_ref().ok_or(LearnerError::NotFitted)?;
        check_prediction_data(x, scaler.n_features())?;
        let z = scaler.transform(x);
        Ok(z.rows().into_iter().map(|row| self.predict_one(row)).collect())
    }
}
