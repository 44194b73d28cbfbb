//! Gaussian naive Bayes

use ndarray::{Array1, Array2, Axis};

use super::error::{LearnerError, Result};
use super::{check_prediction_data, check_training_data, Learner};

#[derive(Debug, Clone)]
struct ClassStats {
    log_prior: f64,
    means: Array1<f64>,
    vars: Array1<f64>,
}

#[derive(Debug, Clone)]
pub struct GaussianNaiveBayes {
    /// Fraction of the largest feature variance added to every variance
    pub var_smoothing: f64,
    /// Per-feature max absolute value; features are divided by it before fitting
    scales: Array1<f64>,
    stats: Option<[ClassStats; 2]>,
}

impl Default for GaussianNaiveBayes {
    fn default() -> Self {
        Self::new()
    }
}

impl GaussianNaiveBayes {
    pub fn new() -> Self {
        Self {
            var_smoothing: 1e-9,
            scales: Array1::zeros(0),
            stats: None,
        }
    }

    pub fn with_var_smoothing(mut self, var_smoothing: f64) -> Self {
        self.var_smoothing = var_smoothing;
        self
    }

    fn class_stats(x: &Array2<f64>, rows: &[usize], n_total: usize, epsilon: f64) -> ClassStats {
        let sub = x.select(Axis(0), rows);
        let n = rows.len() as f64;
        let means = sub
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(x.ncols()));
        let vars = sub.var_axis(Axis(0), 0.0).mapv(|v| v + epsilon);
        ClassStats {
            log_prior: (n / n_total as f64).ln(),
            means,
            vars,
        }
    }

    fn joint_log_likelihood(stats: &ClassStats, row: ndarray::ArrayView1<f64>) -> f64 {
        let mut ll = stats.log_prior;
        for ((&v, &m), &var) in row.iter().zip(stats.means.iter()).zip(stats.vars.iter()) {
            ll -= 0.5 * ((2.0 * std::f64::consts::PI * var).ln() + (v - m).powi(2) / var);
        }
        ll
    }
}

impl Learner for GaussianNaiveBayes {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        if !(self.var_smoothing >= 0.0) {
            return Err(LearnerError::InvalidParameter {
                name: "var_smoothing".to_string(),
                reason: format!("must be non-negative, got {}", self.var_smoothing),
            });
        }

        // Squared deviations of huge abundances overflow; the likelihood ratio is scale invariant
        let scales = x
            .fold_axis(Axis(0), 0.0_f64, |&acc, &v| acc.max(v.abs()))
            .mapv(|s| if s > 0.0 && s.is_finite() { s } else { 1.0 });
        let x = x / &scales;

        let max_var = x
            .var_axis(Axis(0), 0.0)
            .iter()
            .cloned()
            .fold(0.0_f64, f64::max);
        // Keep variances strictly positive even when every column is constant
        let epsilon = (self.var_smoothing * max_var).max(1e-12);

        let neg: Vec<usize> = (0..y.len()).filter(|&i| y[i] < 0.5).collect();
        let pos: Vec<usize> = (0..y.len()).filter(|&i| y[i] >= 0.5).collect();

        self.stats = Some([
            Self::class_stats(&x, &neg, y.len(), epsilon),
            Self::class_stats(&x, &pos, y.len(), epsilon),
        ]);
        self.scales = scales;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let [neg, pos] = self.stats.as_ref().ok_or(LearnerError::NotFitted)?;
        check_prediction_data(x, neg.means.len())?;
        let x = x / &self.scales;

        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let ll_neg = Self::joint_log_likelihood(neg, row);
                let ll_pos = Self::joint_log_likelihood(pos, row);
                // Logistic of the log-likelihood ratio avoids exp overflow
                1.0 / (1.0 + (ll_neg - ll_pos).exp())
            })
            .collect())
    }
}
