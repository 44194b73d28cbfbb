//! Abundance preprocessing: feature selection, normalization and filtering
//!
//! Input is a samples x taxa table of non-negative counts or abundances.
//! Normalization is sample-wise and runs over every raw taxon before any
//! filtering, so relative abundances still sum to one per sample. Prevalence
//! is measured on the raw values.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use serde::Serialize;

/// Column variance at or below this is treated as constant
const ZERO_VARIANCE: f64 = 1e-15;

/// Sample-wise transform applied to raw abundances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    None,
    /// Total-sum scaling to proportions
    #[default]
    Relative,
    /// ln(x + pseudocount)
    Log,
    /// Centered log-ratio
    Clr,
}

impl FromStr for Normalization {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Normalization::None),
            "relative" | "tss" => Ok(Normalization::Relative),
            "log" => Ok(Normalization::Log),
            "clr" => Ok(Normalization::Clr),
            _ => Err(format!(
                "Unknown normalization: '{}'. Use 'none', 'relative', 'log' or 'clr'.",
                s
            )),
        }
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Normalization::None => "none",
            Normalization::Relative => "relative",
            Normalization::Log => "log",
            Normalization::Clr => "clr",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AbundanceConfig {
    pub normalization: Normalization,
    pub pseudocount: f64,
    /// Taxa present (> 0) in fewer than this fraction of samples are dropped
    pub min_prevalence: f64,
}

impl Default for AbundanceConfig {
    fn default() -> Self {
        Self {
            normalization: Normalization::Relative,
            pseudocount: 1e-6,
            min_prevalence: 0.1,
        }
    }
}

/// Candidate feature columns of a frame
#[derive(Debug, Clone, Default)]
pub struct FeatureColumns {
    pub numeric: Vec<String>,
    /// Non-numeric columns that were not excluded explicitly
    pub skipped: Vec<String>,
}

/// Preprocessed feature matrix with bookkeeping on what was removed
#[derive(Debug, Clone)]
pub struct AbundanceTable {
    pub x: Array2<f64>,
    pub feature_names: Vec<String>,
    /// Raw prevalence of each retained feature
    pub prevalence: Vec<f64>,
    pub dropped_low_prevalence: Vec<String>,
    pub dropped_constant: Vec<String>,
}

/// Split the frame's columns into numeric features and skipped columns
pub fn select_feature_columns(df: &DataFrame, excluded: &[&str]) -> FeatureColumns {
    let mut columns = FeatureColumns::default();
    for col in df.get_columns() {
        let name = col.name().to_string();
        if excluded.contains(&name.as_str()) {
            continue;
        }
        if col.dtype().is_primitive_numeric() {
            columns.numeric.push(name);
        } else {
            tracing::warn!(column = %name, dtype = %col.dtype(), "skipping non-numeric column");
            columns.skipped.push(name);
        }
    }
    columns
}

/// Pull the given rows of the given columns into a dense matrix.
///
/// Nulls become 0. Negative or non-finite values are rejected.
pub fn extract_abundances(df: &DataFrame, columns: &[String], rows: &[usize]) -> Result<Array2<f64>> {
    let mut x = Array2::<f64>::zeros((rows.len(), columns.len()));

    for (j, name) in columns.iter().enumerate() {
        let values: Vec<Option<f64>> = df
            .column(name)
            .with_context(|| format!("Column '{}' not found", name))?
            .cast(&DataType::Float64)
            .with_context(|| format!("Column '{}' is not numeric", name))?
            .f64()?
            .into_iter()
            .collect();

        for (i, &row) in rows.iter().enumerate() {
            let value = values.get(row).copied().flatten().unwrap_or(0.0);
            if !value.is_finite() || value < 0.0 {
                anyhow::bail!(
                    "Column '{}' has invalid abundance {} at row {}; abundances must be finite and non-negative",
                    name,
                    value,
                    row
                );
            }
            x[[i, j]] = value;
        }
    }
    Ok(x)
}

/// Fraction of samples with abundance > 0, per taxon
pub fn prevalence(x: &Array2<f64>) -> Array1<f64> {
    let n = x.nrows().max(1) as f64;
    x.axis_iter(Axis(1))
        .map(|col| col.iter().filter(|&&v| v > 0.0).count() as f64 / n)
        .collect()
}

/// Apply a sample-wise normalization to every row
pub fn normalize(x: &Array2<f64>, normalization: Normalization, pseudocount: f64) -> Array2<f64> {
    let mut out = x.clone();
    match normalization {
        Normalization::None => {}
        Normalization::Relative => {
            for mut row in out.rows_mut() {
                let total = row.sum();
                // All-zero samples stay all zeros
                if total > 0.0 {
                    row.mapv_inplace(|v| v / total);
                }
            }
        }
        Normalization::Log => out.mapv_inplace(|v| (v + pseudocount).ln()),
        Normalization::Clr => {
            out.mapv_inplace(|v| (v + pseudocount).ln());
            for mut row in out.rows_mut() {
                let mean = row.mean().unwrap_or(0.0);
                row.mapv_inplace(|v| v - mean);
            }
        }
    }
    out
}

/// Normalize, then drop rare and constant taxa
pub fn preprocess(raw: &Array2<f64>, names: &[String], config: &AbundanceConfig) -> Result<AbundanceTable> {
    if raw.ncols() != names.len() {
        anyhow::bail!(
            "Abundance matrix has {} columns but {} names were given",
            raw.ncols(),
            names.len()
        );
    }
    if !(0.0..=1.0).contains(&config.min_prevalence) {
        anyhow::bail!("min_prevalence must be in [0, 1], got {}", config.min_prevalence);
    }
    if matches!(config.normalization, Normalization::Log | Normalization::Clr)
        && !(config.pseudocount > 0.0)
    {
        anyhow::bail!(
            "pseudocount must be positive for {} normalization, got {}",
            config.normalization,
            config.pseudocount
        );
    }

    let raw_prevalence = prevalence(raw);
    let normalized = normalize(raw, config.normalization, config.pseudocount);
    let variances = normalized.var_axis(Axis(0), 0.0);

    let mut keep = Vec::new();
    let mut dropped_low_prevalence = Vec::new();
    let mut dropped_constant = Vec::new();
    for (j, name) in names.iter().enumerate() {
        if raw_prevalence[j] < config.min_prevalence {
            dropped_low_prevalence.push(name.clone());
        } else if variances[j] <= ZERO_VARIANCE {
            dropped_constant.push(name.clone());
        } else {
            keep.push(j);
        }
    }

    if keep.is_empty() {
        anyhow::bail!(
            "No features left after filtering ({} below prevalence {}, {} constant)",
            dropped_low_prevalence.len(),
            config.min_prevalence,
            dropped_constant.len()
        );
    }

    tracing::debug!(
        kept = keep.len(),
        low_prevalence = dropped_low_prevalence.len(),
        constant = dropped_constant.len(),
        "abundance filtering done"
    );

    Ok(AbundanceTable {
        x: normalized.select(Axis(1), &keep),
        feature_names: keep.iter().map(|&j| names[j].clone()).collect(),
        prevalence: keep.iter().map(|&j| raw_prevalence[j]).collect(),
        dropped_low_prevalence,
        dropped_constant,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("taxon_{}", i)).collect()
    }

    #[test]
    fn test_relative_rows_sum_to_one() {
        let x = array![[2.0, 2.0, 4.0], [0.0, 0.0, 0.0], [1.0, 0.0, 3.0]];
        let z = normalize(&x, Normalization::Relative, 1e-6);

        assert!((z.row(0).sum() - 1.0).abs() < 1e-12);
        assert_eq!(z.row(1).sum(), 0.0);
        assert!((z[[2, 2]] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_clr_rows_are_centered() {
        let x = array![[1.0, 10.0, 100.0], [5.0, 0.0, 2.0]];
        let z = normalize(&x, Normalization::Clr, 0.5);
        for row in z.rows() {
            assert!(row.sum().abs() < 1e-9);
        }
    }

    #[test]
    fn test_prevalence_uses_raw_values() {
        // Under CLR every value becomes non-zero; prevalence must not change
        let x = array![[0.0, 1.0], [0.0, 2.0], [3.0, 0.0], [0.0, 4.0]];
        let config = AbundanceConfig {
            normalization: Normalization::Clr,
            pseudocount: 1.0,
            min_prevalence: 0.5,
        };
        let table = preprocess(&x, &names(2), &config).unwrap();
        assert_eq!(table.feature_names, vec!["taxon_1"]);
        assert_eq!(table.dropped_low_prevalence, vec!["taxon_0"]);
        assert_eq!(table.prevalence, vec![0.75]);
    }

    #[test]
    fn test_constant_features_dropped_after_normalization() {
        let x = array![[1.0, 3.0, 0.0], [2.0, 6.0, 1.0], [4.0, 12.0, 2.0]];
        let config = AbundanceConfig {
            normalization: Normalization::None,
            min_prevalence: 0.0,
            ..Default::default()
        };
        let with_none = preprocess(&x, &names(3), &config).unwrap();
        assert_eq!(with_none.feature_names.len(), 3);

        // Fixed 1:3 ratio, so total-sum scaling makes both columns constant
        let x = array![[1.0, 3.0], [2.0, 6.0], [4.0, 12.0]];
        let config = AbundanceConfig {
            min_prevalence: 0.0,
            ..Default::default()
        };
        let err = preprocess(&x, &names(2), &config).unwrap_err();
        assert!(err.to_string().contains("No features left"));
    }

    #[test]
    fn test_extract_rejects_negative_and_fills_nulls() {
        let df = df! {
            "a" => [Some(1.0f64), None, Some(2.0)],
            "b" => [0.0f64, -1.0, 3.0],
        }
        .unwrap();

        let x = extract_abundances(&df, &["a".to_string()], &[0, 1, 2]).unwrap();
        assert_eq!(x.column(0).to_vec(), vec![1.0, 0.0, 2.0]);

        let err = extract_abundances(&df, &["b".to_string()], &[0, 1, 2]).unwrap_err();
        assert!(err.to_string().contains("'b'"));

        // Row 1 is excluded, so the negative value is never read
        let x = extract_abundances(&df, &["b".to_string()], &[0, 2]).unwrap();
        assert_eq!(x.column(0).to_vec(), vec![0.0, 3.0]);
    }

    #[test]
    fn test_select_feature_columns_skips_text() {
        let df = df! {
            "sample" => ["s1", "s2"],
            "status" => ["CRC", "healthy"],
            "Bacteroides" => [1.0f64, 2.0],
            "Prevotella" => [0i64, 4],
        }
        .unwrap();

        let cols = select_feature_columns(&df, &["status"]);
        assert_eq!(cols.numeric, vec!["Bacteroides", "Prevotella"]);
        assert_eq!(cols.skipped, vec!["sample"]);
    }

    #[test]
    fn test_normalization_parse() {
        assert_eq!("CLR".parse::<Normalization>().unwrap(), Normalization::Clr);
        assert!("zscore".parse::<Normalization>().is_err());
    }
}
