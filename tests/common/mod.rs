//! Shared test utilities and fixture generators

use microdx::learners::LearnerKind;
use microdx::pipeline::{build_task, ClassificationTask, RunConfig, TaskSpec, TuneConfig};
use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Number of pure-noise taxa in the synthetic abundance table
pub const NOISE_TAXA: usize = 5;

/// Create a synthetic abundance table with known structure
///
/// This DataFrame includes:
/// - `sample_id`: Unique sample identifier ("S001", ...)
/// - `status`: "CRC" (event) or "healthy", alternating
/// - `site`: Non-numeric metadata, skipped as a feature
/// - `taxon_up`: Enriched in CRC samples
/// - `taxon_down`: Depleted in CRC samples
/// - `taxon_noise_0..4`: Same distribution in both classes
/// - `taxon_rare`: Present in a single sample (dropped by the prevalence filter)
pub fn create_abundance_dataframe(n_samples: usize, seed: u64) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let sample_id: Vec<String> = (0..n_samples).map(|i| format!("S{:03}", i + 1)).collect();
    let is_event: Vec<bool> = (0..n_samples).map(|i| i % 2 == 0).collect();
    let status: Vec<&str> = is_event
        .iter()
        .map(|&e| if e { "CRC" } else { "healthy" })
        .collect();
    let site: Vec<&str> = (0..n_samples)
        .map(|i| if i % 3 == 0 { "gut" } else { "stool" })
        .collect();

    let up: Vec<f64> = is_event
        .iter()
        .map(|&e| {
            let base: f64 = if e { 400.0 } else { 40.0 };
            (base + rng.gen_range(0.0..60.0)).round()
        })
        .collect();
    let down: Vec<f64> = is_event
        .iter()
        .map(|&e| {
            let base: f64 = if e { 30.0 } else { 300.0 };
            (base + rng.gen_range(0.0..60.0)).round()
        })
        .collect();
    let rare: Vec<f64> = (0..n_samples).map(|i| if i == 0 { 7.0 } else { 0.0 }).collect();

    let mut columns = vec![
        Column::new("sample_id".into(), sample_id),
        Column::new("status".into(), status),
        Column::new("site".into(), site),
        Column::new("taxon_up".into(), up),
        Column::new("taxon_down".into(), down),
    ];
    for j in 0..NOISE_TAXA {
        let noise: Vec<f64> = (0..n_samples)
            .map(|_| rng.gen_range(50.0..250.0f64).round())
            .collect();
        columns.push(Column::new(format!("taxon_noise_{}", j).into(), noise));
    }
    columns.push(Column::new("taxon_rare".into(), rare));

    DataFrame::new(columns).unwrap()
}

/// Same table with the outcome already encoded as 0/1 in `label`
pub fn create_binary_abundance_dataframe(n_samples: usize, seed: u64) -> DataFrame {
    let mut df = create_abundance_dataframe(n_samples, seed);
    let label: Vec<i32> = (0..n_samples).map(|i| i32::from(i % 2 == 0)).collect();
    df.with_column(Column::new("label".into(), label)).unwrap();
    df.drop_many(["status"])
}

/// Write a DataFrame as CSV under `dir`
pub fn write_csv(df: &mut DataFrame, dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();
    path
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = write_csv(df, temp_dir.path(), "abundance.csv");
    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("abundance.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Spec for the synthetic table's "status" column
pub fn crc_task_spec() -> TaskSpec {
    TaskSpec {
        target: "status".to_string(),
        mapping: Some(microdx::pipeline::TargetMapping::new("CRC", "healthy")),
        id_column: Some("sample_id".to_string()),
        drop_columns: Vec::new(),
        abundance: Default::default(),
    }
}

/// Build the classification task of a synthetic table
pub fn create_crc_task(n_samples: usize, seed: u64) -> ClassificationTask {
    let df = create_abundance_dataframe(n_samples, seed);
    let (task, _) = build_task(&df, Path::new("crc.csv"), &crc_task_spec()).unwrap();
    task
}

/// Small, fast run settings for integration tests
pub fn quick_run_config(models: &[LearnerKind]) -> RunConfig {
    RunConfig {
        models: models.to_vec(),
        tune: TuneConfig::new().with_n_evals(3).with_folds(3).with_seed(7),
        importance_repeats: 2,
        top_features: 5,
        ..RunConfig::default()
    }
}

/// Copy of `task` with an extra taxon that is +inf in every sample
///
/// Standardizing or fitting a Gaussian to this column yields NaN, so logistic
/// regression and naive Bayes fail on it while trees ignore it.
pub fn with_infinite_taxon(task: &ClassificationTask) -> ClassificationTask {
    let column = ndarray::Array2::from_elem((task.n_samples(), 1), f64::INFINITY);
    let x = ndarray::concatenate(ndarray::Axis(1), &[task.x.view(), column.view()]).unwrap();
    let mut names = task.feature_names.clone();
    names.push("taxon_overflow".to_string());
    ClassificationTask::new(task.id.clone(), names, task.sample_ids.clone(), x, task.y.clone())
        .unwrap()
        .with_labels(task.positive_label.clone(), task.negative_label.clone())
}
