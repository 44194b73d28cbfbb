//! Binary classification task built from an abundance table

use std::path::Path;

use anyhow::{Context, Result};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use super::abundance::{extract_abundances, preprocess, select_feature_columns, AbundanceConfig};
use super::target::{binary_labels, column_to_string_vec, TargetMapping};

/// Samples per class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClassCounts {
    pub negative: usize,
    pub positive: usize,
}

impl ClassCounts {
    pub fn minority(&self) -> usize {
        self.negative.min(self.positive)
    }

    pub fn total(&self) -> usize {
        self.negative + self.positive
    }
}

/// Samples x taxa matrix with 0/1 outcome labels
#[derive(Debug, Clone)]
pub struct ClassificationTask {
    pub id: String,
    pub feature_names: Vec<String>,
    pub sample_ids: Vec<String>,
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    pub positive_label: String,
    pub negative_label: String,
}

impl ClassificationTask {
    pub fn new(
        id: impl Into<String>,
        feature_names: Vec<String>,
        sample_ids: Vec<String>,
        x: Array2<f64>,
        y: Array1<f64>,
    ) -> Result<Self> {
        if x.nrows() != y.len() || x.nrows() != sample_ids.len() {
            anyhow::bail!(
                "Task has {} rows, {} labels and {} sample ids",
                x.nrows(),
                y.len(),
                sample_ids.len()
            );
        }
        if x.ncols() != feature_names.len() {
            anyhow::bail!(
                "Task has {} feature columns but {} feature names",
                x.ncols(),
                feature_names.len()
            );
        }
        if let Some(bad) = y.iter().find(|&&v| v != 0.0 && v != 1.0) {
            anyhow::bail!("Labels must be 0 or 1, found {}", bad);
        }

        Ok(Self {
            id: id.into(),
            feature_names,
            sample_ids,
            x,
            y,
            positive_label: "1".to_string(),
            negative_label: "0".to_string(),
        })
    }

    pub fn with_labels(mut self, positive: impl Into<String>, negative: impl Into<String>) -> Self {
        self.positive_label = positive.into();
        self.negative_label = negative.into();
        self
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    pub fn class_counts(&self) -> ClassCounts {
        let positive = self.y.iter().filter(|&&v| v == 1.0).count();
        ClassCounts {
            negative: self.y.len() - positive,
            positive,
        }
    }

    /// New task restricted to the given rows, in the given order
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            id: self.id.clone(),
            feature_names: self.feature_names.clone(),
            sample_ids: indices.iter().map(|&i| self.sample_ids[i].clone()).collect(),
            x: self.x.select(Axis(0), indices),
            y: self.y.select(Axis(0), indices),
            positive_label: self.positive_label.clone(),
            negative_label: self.negative_label.clone(),
        }
    }

    /// Split into (train, test), preserving the class ratio.
    ///
    /// Each class sends `round(n_c * test_ratio)` samples to the test side,
    /// clamped so that both sides keep at least one sample of every class.
    pub fn stratified_holdout(&self, test_ratio: f64, seed: u64) -> Result<(Self, Self)> {
        if !(test_ratio > 0.0 && test_ratio < 1.0) {
            anyhow::bail!("test_ratio must be in (0, 1), got {}", test_ratio);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut train = Vec::new();
        let mut test = Vec::new();

        for class in [0.0, 1.0] {
            let mut members: Vec<usize> = (0..self.y.len()).filter(|&i| self.y[i] == class).collect();
            if members.len() < 2 {
                anyhow::bail!(
                    "Class {} has {} sample(s); at least 2 are needed for a holdout split",
                    class,
                    members.len()
                );
            }
            members.shuffle(&mut rng);

            let n_test = ((members.len() as f64 * test_ratio).round() as usize)
                .clamp(1, members.len() - 1);
            test.extend_from_slice(&members[..n_test]);
            train.extend_from_slice(&members[n_test..]);
        }

        train.sort_unstable();
        test.sort_unstable();
        Ok((self.subset(&train), self.subset(&test)))
    }

    /// Fail unless every class has at least `folds` samples
    pub fn check_folds(&self, folds: usize) -> Result<()> {
        let counts = self.class_counts();
        if counts.minority() < folds {
            anyhow::bail!(
                "Training set has {} negative and {} positive samples; {} folds need at least {} per class",
                counts.negative,
                counts.positive,
                folds,
                folds
            );
        }
        Ok(())
    }
}

/// How to turn a loaded frame into a task
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub target: String,
    pub mapping: Option<TargetMapping>,
    pub id_column: Option<String>,
    pub drop_columns: Vec<String>,
    pub abundance: AbundanceConfig,
}

/// What happened to rows and columns while building the task
#[derive(Debug, Clone, Serialize)]
pub struct DataSummary {
    pub input_rows: usize,
    pub excluded_rows: usize,
    pub n_samples: usize,
    pub candidate_features: usize,
    pub n_features: usize,
    pub skipped_columns: Vec<String>,
    pub dropped_low_prevalence: Vec<String>,
    pub dropped_constant: Vec<String>,
    pub class_counts: ClassCounts,
}

/// Build the classification task from a loaded frame
pub fn build_task(df: &DataFrame, input: &Path, spec: &TaskSpec) -> Result<(ClassificationTask, DataSummary)> {
    for name in spec.id_column.iter().chain(spec.drop_columns.iter()) {
        if df.column(name).is_err() {
            anyhow::bail!("Column '{}' not found in dataset", name);
        }
    }

    let labels = binary_labels(df, &spec.target, spec.mapping.as_ref())?;
    let rows: Vec<usize> = (0..labels.len()).filter(|&i| labels[i].is_some()).collect();
    let y: Array1<f64> = rows
        .iter()
        .map(|&i| labels[i].map(f64::from).unwrap_or(0.0))
        .collect();

    let mut excluded: Vec<&str> = vec![spec.target.as_str()];
    excluded.extend(spec.id_column.as_deref());
    excluded.extend(spec.drop_columns.iter().map(String::as_str));
    let columns = select_feature_columns(df, &excluded);
    if columns.numeric.is_empty() {
        anyhow::bail!("No numeric feature columns found");
    }

    let raw = extract_abundances(df, &columns.numeric, &rows)?;
    let table = preprocess(&raw, &columns.numeric, &spec.abundance)?;

    let sample_ids: Vec<String> = match &spec.id_column {
        Some(id_col) => {
            let values = column_to_string_vec(df.column(id_col)?)
                .with_context(|| format!("Failed to read id column '{}'", id_col))?;
            rows.iter()
                .map(|&i| values[i].clone().unwrap_or_else(|| i.to_string()))
                .collect()
        }
        None => rows.iter().map(|i| i.to_string()).collect(),
    };

    let id = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("task")
        .to_string();

    let mut task = ClassificationTask::new(id, table.feature_names, sample_ids, table.x, y)?;
    if let Some(mapping) = &spec.mapping {
        task = task.with_labels(&mapping.event_value, &mapping.non_event_value);
    }

    let summary = DataSummary {
        input_rows: df.height(),
        excluded_rows: df.height() - rows.len(),
        n_samples: task.n_samples(),
        candidate_features: columns.numeric.len(),
        n_features: task.n_features(),
        skipped_columns: columns.skipped,
        dropped_low_prevalence: table.dropped_low_prevalence,
        dropped_constant: table.dropped_constant,
        class_counts: task.class_counts(),
    };

    Ok((task, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn task(n_neg: usize, n_pos: usize) -> ClassificationTask {
        let n = n_neg + n_pos;
        let x = Array::from_shape_fn((n, 2), |(i, j)| (i * (j + 1)) as f64);
        let y = Array1::from_shape_fn(n, |i| if i < n_neg { 0.0 } else { 1.0 });
        let ids = (0..n).map(|i| format!("s{}", i)).collect();
        ClassificationTask::new("t", vec!["a".into(), "b".into()], ids, x, y).unwrap()
    }

    #[test]
    fn test_holdout_preserves_class_ratio() {
        let t = task(60, 20);
        let (train, test) = t.stratified_holdout(0.25, 7).unwrap();

        assert_eq!(test.class_counts(), ClassCounts { negative: 15, positive: 5 });
        assert_eq!(train.class_counts(), ClassCounts { negative: 45, positive: 15 });

        let mut all: Vec<String> = train.sample_ids.iter().chain(test.sample_ids.iter()).cloned().collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 80);
    }

    #[test]
    fn test_holdout_keeps_one_of_each_class_per_side() {
        let t = task(10, 2);
        let (train, test) = t.stratified_holdout(0.05, 1).unwrap();
        assert_eq!(test.class_counts().positive, 1);
        assert_eq!(train.class_counts().positive, 1);
        assert!(test.class_counts().negative >= 1);
    }

    #[test]
    fn test_holdout_rejects_singleton_class() {
        assert!(task(10, 1).stratified_holdout(0.25, 1).is_err());
    }

    #[test]
    fn test_subset_carries_rows() {
        let t = task(3, 3);
        let sub = t.subset(&[5, 0]);
        assert_eq!(sub.sample_ids, vec!["s5", "s0"]);
        assert_eq!(sub.y.to_vec(), vec![1.0, 0.0]);
        assert_eq!(sub.x.row(0).to_vec(), t.x.row(5).to_vec());
    }

    #[test]
    fn test_check_folds() {
        let t = task(10, 4);
        assert!(t.check_folds(4).is_ok());
        assert!(t.check_folds(5).is_err());
    }

    #[test]
    fn test_new_rejects_non_binary_labels() {
        let x = Array2::zeros((2, 1));
        let y = Array1::from_vec(vec![0.0, 2.0]);
        let res = ClassificationTask::new("t", vec!["a".into()], vec!["0".into(), "1".into()], x, y);
        assert!(res.is_err());
    }
}
