//! JSON and CSV exports of a benchmark run

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use polars::prelude::*;
use serde::Serialize;

use crate::learners::{LearnerKind, DECISION_THRESHOLD};
use crate::pipeline::{AggregateImportance, BenchmarkResult, DataSummary, ModelResult, RunConfig, TargetMapping};

/// Metadata about the run
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Timestamp of the run (RFC 3339)
    pub timestamp: String,
    pub microdx_version: String,
    pub input_file: String,
    pub target_column: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_mapping: Option<TargetMapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_column: Option<String>,
    pub config: RunConfig,
}

impl ReportMetadata {
    pub fn new(
        input_file: &Path,
        target_column: &str,
        target_mapping: Option<TargetMapping>,
        id_column: Option<String>,
        config: RunConfig,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            microdx_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: input_file.display().to_string(),
            target_column: target_column.to_string(),
            target_mapping,
            id_column,
            config,
        }
    }
}

/// Complete model comparison export
#[derive(Serialize)]
pub struct ModelComparisonReport<'a> {
    pub metadata: &'a ReportMetadata,
    pub data_summary: &'a DataSummary,
    pub best_model: Option<LearnerKind>,
    pub models: &'a [ModelResult],
    pub aggregate_importance: &'a [AggregateImportance],
}

/// Write `<stem>_model_comparison.json`
pub fn export_model_comparison(
    path: &Path,
    metadata: &ReportMetadata,
    summary: &DataSummary,
    result: &BenchmarkResult,
) -> Result<()> {
    let report = ModelComparisonReport {
        metadata,
        data_summary: summary,
        best_model: result.best_model,
        models: &result.models,
        aggregate_importance: &result.aggregate_importance,
    };

    let json = serde_json::to_string_pretty(&report).context("Failed to serialize model comparison")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write model comparison to {}", path.display()))?;
    Ok(())
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create output file: {}", path.display()))?;
    CsvWriter::new(&mut file)
        .finish(df)
        .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
    Ok(())
}

/// Long-format importance table, one row per (model, feature)
pub fn importance_frame(result: &BenchmarkResult) -> Result<DataFrame> {
    let mut model = Vec::new();
    let mut feature = Vec::new();
    let mut mean = Vec::new();
    let mut sd = Vec::new();
    let mut rank = Vec::new();
    let mut native = Vec::new();

    for m in result.successful() {
        for entry in &m.importance {
            model.push(m.learner.name().to_string());
            feature.push(entry.feature.clone());
            mean.push(entry.importance_mean);
            sd.push(entry.importance_sd);
            rank.push(entry.rank as u32);
            native.push(entry.native_importance);
        }
    }

    let df = df!(
        "model" => model,
        "feature" => feature,
        "importance_mean" => mean,
        "importance_sd" => sd,
        "rank" => rank,
        "native_importance" => native
    )?;
    Ok(df)
}

/// Holdout predictions of every successful model
pub fn predictions_frame(result: &BenchmarkResult) -> Result<DataFrame> {
    let mut model = Vec::new();
    let mut sample_id = Vec::new();
    let mut truth = Vec::new();
    let mut probability = Vec::new();
    let mut predicted = Vec::new();

    for m in result.successful() {
        for ((id, &t), &p) in result
            .test_sample_ids
            .iter()
            .zip(result.test_truth.iter())
            .zip(m.test_probabilities.iter())
        {
            model.push(m.learner.name().to_string());
            sample_id.push(id.clone());
            truth.push(t as i32);
            probability.push(p);
            predicted.push(i32::from(p >= DECISION_THRESHOLD));
        }
    }

    let df = df!(
        "model" => model,
        "sample_id" => sample_id,
        "truth" => truth,
        "probability" => probability,
        "predicted" => predicted
    )?;
    Ok(df)
}

/// Write `<stem>_importance.csv`
pub fn export_importance_csv(path: &Path, result: &BenchmarkResult) -> Result<()> {
    let mut df = importance_frame(result)?;
    write_csv(&mut df, path)
}

/// Write `<stem>_predictions.csv`
pub fn export_predictions_csv(path: &Path, result: &BenchmarkResult) -> Result<()> {
    let mut df = predictions_frame(result)?;
    write_csv(&mut df, path)
}
