//! L2-regularized logistic regression

use ndarray::{Array1, Array2};

use super::error::{LearnerError, Result};
use super::scaling::Standardizer;
use super::{check_prediction_data, check_training_data, normalize_importance, Learner};

/// Logistic regression fitted by full-batch gradient descent on standardized inputs
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    /// L2 penalty strength
    pub alpha: f64,
    pub max_iter: usize,
    pub learning_rate: f64,
    /// Stop when the gradient norm falls below this value
    pub tol: f64,
    scaler: Option<Standardizer>,
    coefficients: Option<Array1<f64>>,
    intercept: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            alpha: 0.01,
            max_iter: 1000,
            learning_rate: 0.5,
            tol: 1e-6,
            scaler: None,
            coefficients: None,
            intercept: 0.0,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Coefficients on the standardized feature scale
    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }
}

impl Learner for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        if !(self.alpha >= 0.0) {
            return Err(LearnerError::InvalidParameter {
                name: "alpha".to_string(),
                reason: format!("must be non-negative, got {}", self.alpha),
            });
        }

        let scaler = Standardizer::fit(x);
        let z = scaler.transform(x);
        let n = z.nrows() as f64;

        let mut weights: Array1<f64> = Array1::zeros(z.ncols());
        // Start the intercept at the log-odds of the prior
        let prior = (y.sum() / n).clamp(1e-6, 1.0 - 1e-6);
        let mut bias = (prior / (1.0 - prior)).ln();

        for _ in 0..self.max_iter {
            let linear = z.dot(&weights) + bias;
            let errors = Self::sigmoid(&linear) - y;

            let data_grad = z.t().dot(&errors) / n;
            let db = errors.sum() / n;

            let dw = &data_grad + &(self.alpha * &weights);
            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            // Proximal step for the L2 term keeps large penalties stable
            weights = (weights - self.learning_rate * data_grad)
                / (1.0 + self.learning_rate * self.alpha);
            bias -= self.learning_rate * db;
        }

        self.scaler = Some(scaler);
        self.coefficients = Some(weights);
        self.intercept = bias;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (scaler, coefficients) = match (&self.scaler, &self.coefficients) {
            (Some(s), Some(c)) => (s, c),
            _ => return Err(LearnerError::NotFitted),
        };
        check_prediction_data(x, scaler.n_features())?;

        let linear = scaler.transform(x).dot(coefficients) + self.intercept;
        Ok(Self::sigmoid(&linear))
    }

    fn feature_importance(&self) -> Option<Array1<f64>> {
        self.coefficients
            .as_ref()
            .map(|c| normalize_importance(c.mapv(f64::abs)))
    }
}
