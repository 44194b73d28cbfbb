//! Dataset loader for CSV and Parquet abundance tables

use anyhow::{Context, Result};
use polars::prelude::*;
use std::path::Path;

use crate::utils::{create_spinner, finish_with_success};

/// Supported input formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Parquet,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "csv" => Ok(InputFormat::Csv),
            "parquet" => Ok(InputFormat::Parquet),
            _ => anyhow::bail!(
                "Unsupported file format: '{}'. Supported formats: csv, parquet",
                extension
            ),
        }
    }
}

/// Lazily scan a dataset (CSV or Parquet based on extension)
pub fn scan_dataset(path: &Path, infer_schema_length: usize) -> Result<LazyFrame> {
    let lf = match InputFormat::from_path(path)? {
        InputFormat::Csv => LazyCsvReader::new(path)
            .with_infer_schema_length(Some(infer_schema_length))
            .finish()
            .with_context(|| format!("Failed to load CSV file: {}", path.display()))?,
        InputFormat::Parquet => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
    };

    Ok(lf)
}

/// Load a dataset fully into memory behind a spinner.
///
/// Returns the frame together with its row count, column count and the
/// estimated in-memory size in MB.
pub fn load_dataset_with_progress(
    path: &Path,
    infer_schema_length: usize,
) -> Result<(DataFrame, usize, usize, f64)> {
    let spinner = create_spinner(&format!("Loading {}...", path.display()));
    let df = scan_dataset(path, infer_schema_length)?
        .collect()
        .with_context(|| format!("Failed to read {}", path.display()))?;
    finish_with_success(&spinner, "Dataset loaded");

    let (rows, cols) = df.shape();
    let memory_mb = df.estimated_size() as f64 / (1024.0 * 1024.0);
    tracing::debug!(rows, cols, memory_mb, "loaded {}", path.display());

    Ok((df, rows, cols, memory_mb))
}

/// Column names from the schema, without collecting any data
pub fn get_column_names(path: &Path, infer_schema_length: usize) -> Result<Vec<String>> {
    let mut lf = scan_dataset(path, infer_schema_length)?;
    let schema = lf
        .collect_schema()
        .with_context(|| format!("Failed to read schema of {}", path.display()))?;

    Ok(schema.iter_names().map(|name| name.to_string()).collect())
}
