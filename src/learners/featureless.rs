//! Baseline that ignores the features and predicts the training prior

use ndarray::{Array1, Array2};

use super::error::{LearnerError, Result};
use super::{check_training_data, Learner};

#[derive(Debug, Clone, Default)]
pub struct Featureless {
    prior: Option<f64>,
}

impl Featureless {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Learner for Featureless {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        self.prior = Some(y.sum() / y.len() as f64);
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let prior = self.prior.ok_or(LearnerError::NotFitted)?;
        Ok(Array1::from_elem(x.nrows(), prior))
    }
}
