//! Target column analysis and mapping
//!
//! The outcome column is either already 0/1 (condition detected or not) or
//! holds arbitrary labels that are mapped to 0/1 with a [`TargetMapping`].
//! Rows that match neither label, or have a null outcome, are left out of
//! the classification task.

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Tolerance for floating point comparison when checking binary 0/1 values
const TOLERANCE: f64 = 1e-9;

/// Mapping of outcome labels to 1 (event) and 0 (non-event)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetMapping {
    /// Value that maps to 1, e.g. "CRC"
    pub event_value: String,
    /// Value that maps to 0, e.g. "healthy"
    pub non_event_value: String,
}

impl TargetMapping {
    pub fn new(event_value: impl Into<String>, non_event_value: impl Into<String>) -> Self {
        Self {
            event_value: event_value.into(),
            non_event_value: non_event_value.into(),
        }
    }
}

/// Result of analyzing a target column
#[derive(Debug, Clone)]
pub enum TargetAnalysis {
    /// Target column is already binary 0/1, no mapping needed
    AlreadyBinary,
    /// Target column needs mapping; holds its distinct values, sorted
    NeedsMapping { unique_values: Vec<String> },
}

/// Decide whether a target column needs value mapping.
///
/// Fails on a missing, empty or all-null column.
pub fn analyze_target_column(df: &DataFrame, target: &str) -> Result<TargetAnalysis> {
    let target_col = df
        .column(target)
        .with_context(|| format!("Target column '{}' not found", target))?;

    if target_col.len() == 0 {
        anyhow::bail!("Target column '{}' is empty", target);
    }
    if target_col.null_count() == target_col.len() {
        anyhow::bail!("Target column '{}' contains only null values", target);
    }

    if target_col.dtype().is_primitive_numeric() {
        let distinct: Vec<f64> = target_col
            .cast(&DataType::Float64)?
            .unique()?
            .f64()?
            .into_iter()
            .flatten()
            .collect();

        let is_binary = distinct.len() <= 2
            && distinct
                .iter()
                .all(|&v| v.abs() < TOLERANCE || (v - 1.0).abs() < TOLERANCE);
        if is_binary {
            return Ok(TargetAnalysis::AlreadyBinary);
        }
    }

    let mut unique_values: Vec<String> = column_to_string_vec(&target_col.unique()?)?
        .into_iter()
        .flatten()
        .collect();
    unique_values.sort();

    Ok(TargetAnalysis::NeedsMapping { unique_values })
}

/// Render every value of a column as an optional string
pub(crate) fn column_to_string_vec(col: &Column) -> Result<Vec<Option<String>>> {
    let values: Vec<Option<String>> = match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect(),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => col
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| v.map(|n| n.to_string()))
            .collect(),
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => col
            .cast(&DataType::UInt64)?
            .u64()?
            .into_iter()
            .map(|v| v.map(|n| n.to_string()))
            .collect(),
        DataType::Float32 | DataType::Float64 => col
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.map(|n| format!("{}", n)))
            .collect(),
        DataType::Boolean => col
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| b.to_string()))
            .collect(),
        _ => col
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect(),
    };

    Ok(values)
}

/// Per-row mask: `Some(1)` for events, `Some(0)` for non-events, `None` otherwise
pub fn create_target_mask(
    df: &DataFrame,
    target: &str,
    mapping: &TargetMapping,
) -> Result<Vec<Option<i32>>> {
    let target_col = df
        .column(target)
        .with_context(|| format!("Target column '{}' not found", target))?;

    Ok(column_to_string_vec(target_col)?
        .iter()
        .map(|v| match v {
            Some(s) if s == &mapping.event_value => Some(1),
            Some(s) if s == &mapping.non_event_value => Some(0),
            _ => None,
        })
        .collect())
}

/// Count events, non-events and ignored rows under a mapping
pub fn count_mapped_records(
    df: &DataFrame,
    target: &str,
    mapping: &TargetMapping,
) -> Result<(usize, usize, usize)> {
    let mask = create_target_mask(df, target, mapping)?;
    Ok(count_mask(&mask))
}

/// 0/1 labels for every row, `None` where the row is excluded.
///
/// Without a mapping the column must already be binary. Fails when fewer
/// than two classes remain.
pub fn binary_labels(
    df: &DataFrame,
    target: &str,
    mapping: Option<&TargetMapping>,
) -> Result<Vec<Option<i32>>> {
    let labels = match mapping {
        Some(mapping) => create_target_mask(df, target, mapping)?,
        None => {
            if let TargetAnalysis::NeedsMapping { unique_values } =
                analyze_target_column(df, target)?
            {
                anyhow::bail!(
                    "Target column '{}' is not 0/1 (values: {}). Use --event-value and --non-event-value",
                    target,
                    unique_values.join(", ")
                );
            }
            df.column(target)?
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .map(|v| v.map(|x| if (x - 1.0).abs() < TOLERANCE { 1 } else { 0 }))
                .collect()
        }
    };

    let (events, non_events, _) = count_mask(&labels);
    if events == 0 || non_events == 0 {
        anyhow::bail!(
            "Target column '{}' needs both classes after mapping ({} event, {} non-event)",
            target,
            events,
            non_events
        );
    }
    Ok(labels)
}

fn count_mask(mask: &[Option<i32>]) -> (usize, usize, usize) {
    let events = mask.iter().filter(|v| **v == Some(1)).count();
    let non_events = mask.iter().filter(|v| **v == Some(0)).count();
    let ignored = mask.iter().filter(|v| v.is_none()).count();
    (events, non_events, ignored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_int_target_needs_no_mapping() {
        let df = df! {
            "disease" => [0i32, 1, 0, 1],
            "Bacteroides" => [1.0f64, 2.0, 3.0, 4.0],
        }
        .unwrap();

        let result = analyze_target_column(&df, "disease").unwrap();
        assert!(matches!(result, TargetAnalysis::AlreadyBinary));
    }

    #[test]
    fn test_string_target_lists_sorted_values() {
        let df = df! {
            "status" => ["healthy", "CRC", "adenoma", "CRC"],
        }
        .unwrap();

        match analyze_target_column(&df, "status").unwrap() {
            TargetAnalysis::NeedsMapping { unique_values } => {
                assert_eq!(unique_values, vec!["CRC", "adenoma", "healthy"]);
            }
            other => panic!("expected NeedsMapping, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric_non_binary_target_needs_mapping() {
        let df = df! { "stage" => [1i32, 2, 3, 1] }.unwrap();
        assert!(matches!(
            analyze_target_column(&df, "stage").unwrap(),
            TargetAnalysis::NeedsMapping { .. }
        ));
    }

    #[test]
    fn test_mask_excludes_unmapped_and_null() {
        let df = df! {
            "status" => [Some("CRC"), Some("healthy"), Some("adenoma"), None],
        }
        .unwrap();

        let mapping = TargetMapping::new("CRC", "healthy");
        let mask = create_target_mask(&df, "status", &mapping).unwrap();
        assert_eq!(mask, vec![Some(1), Some(0), None, None]);
        assert_eq!(count_mapped_records(&df, "status", &mapping).unwrap(), (1, 1, 2));
    }

    #[test]
    fn test_binary_labels_from_float_column_keeps_nulls_out() {
        let df = df! { "y" => [Some(1.0f64), None, Some(0.0), Some(1.0)] }.unwrap();
        let labels = binary_labels(&df, "y", None).unwrap();
        assert_eq!(labels, vec![Some(1), None, Some(0), Some(1)]);
    }

    #[test]
    fn test_binary_labels_rejects_single_class_after_mapping() {
        let df = df! { "status" => ["CRC", "CRC", "adenoma"] }.unwrap();
        let mapping = TargetMapping::new("CRC", "healthy");
        let err = binary_labels(&df, "status", Some(&mapping)).unwrap_err();
        assert!(err.to_string().contains("both classes"));
    }

    #[test]
    fn test_binary_labels_requires_mapping_for_labels() {
        let df = df! { "status" => ["CRC", "healthy"] }.unwrap();
        assert!(binary_labels(&df, "status", None).is_err());
    }

    #[test]
    fn test_empty_and_null_targets_are_errors() {
        let empty = df! { "y" => Vec::<i32>::new() }.unwrap();
        assert!(analyze_target_column(&empty, "y")
            .unwrap_err()
            .to_string()
            .contains("empty"));

        let nulls = df! { "y" => [None::<String>, None] }.unwrap();
        assert!(analyze_target_column(&nulls, "y")
            .unwrap_err()
            .to_string()
            .contains("null"));
    }
}
