//! Column standardization for distance- and gradient-based learners

use ndarray::{Array1, Array2, Axis};

/// Per-column z-scoring fitted on training data
#[derive(Debug, Clone, Default)]
pub struct Standardizer {
    means: Array1<f64>,
    stds: Array1<f64>,
}

impl Standardizer {
    /// Fit means and population standard deviations. Constant columns get std 1.
    pub fn fit(x: &Array2<f64>) -> Self {
        let n = x.nrows().max(1) as f64;
        let means = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(x.ncols()));
        let mut stds = Array1::zeros(x.ncols());
        for (j, col) in x.axis_iter(Axis(1)).enumerate() {
            let var = col.iter().map(|v| (v - means[j]).powi(2)).sum::<f64>() / n;
            let sd = var.sqrt();
            stds[j] = if sd > 1e-12 { sd } else { 1.0 };
        }
        Self { means, stds }
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut out = x.to_owned();
        for (j, mut col) in out.axis_iter_mut(Axis(1)).enumerate() {
            let (m, s) = (self.means[j], self.stds[j]);
            col.mapv_inplace(|v| (v - m) / s);
        }
        out
    }

    pub fn n_features(&self) -> usize {
        self.means.len()
    }
}
