//! Tests for target column mapping on abundance tables

use microdx::pipeline::*;
use polars::prelude::*;
use std::path::Path;

mod common;

/// Three phenotypes; "adenoma" is neither event nor non-event
fn create_multivalue_target_dataframe() -> DataFrame {
    df! {
        "status" => ["CRC", "healthy", "adenoma", "CRC", "healthy", "adenoma",
                     "CRC", "healthy", "adenoma", "CRC", "healthy", "CRC"],
        "taxon_a" => [9.0f64, 1.0, 5.0, 8.0, 2.0, 4.0, 9.5, 1.5, 5.5, 8.5, 2.5, 9.2],
        "taxon_b" => [1.0f64, 7.0, 4.0, 2.0, 6.0, 5.0, 1.5, 7.5, 4.5, 2.5, 6.5, 1.2]
    }
    .unwrap()
}

#[test]
fn test_string_target_needs_mapping() {
    let df = create_multivalue_target_dataframe();

    match analyze_target_column(&df, "status").unwrap() {
        TargetAnalysis::NeedsMapping { unique_values } => {
            assert_eq!(unique_values, vec!["CRC", "adenoma", "healthy"]);
        }
        TargetAnalysis::AlreadyBinary => panic!("string target should need mapping"),
    }
}

#[test]
fn test_binary_numeric_target_is_detected() {
    let df = common::create_binary_abundance_dataframe(8, 3);
    assert!(matches!(
        analyze_target_column(&df, "label").unwrap(),
        TargetAnalysis::AlreadyBinary
    ));

    let labels = binary_labels(&df, "label", None).unwrap();
    assert!(labels.iter().all(|l| l.is_some()));
    assert_eq!(labels.iter().filter(|l| **l == Some(1)).count(), 4);
}

#[test]
fn test_unmapped_rows_are_ignored() {
    let df = create_multivalue_target_dataframe();
    let mapping = TargetMapping::new("CRC", "healthy");

    let (events, non_events, ignored) = count_mapped_records(&df, "status", &mapping).unwrap();
    assert_eq!((events, non_events, ignored), (5, 4, 3));

    let mask = create_target_mask(&df, "status", &mapping).unwrap();
    assert_eq!(mask[0], Some(1));
    assert_eq!(mask[1], Some(0));
    assert_eq!(mask[2], None);
}

#[test]
fn test_string_target_without_mapping_fails() {
    let df = create_multivalue_target_dataframe();
    let err = binary_labels(&df, "status", None).unwrap_err();
    assert!(err.to_string().contains("--event-value"));
}

#[test]
fn test_mapping_to_a_single_class_fails() {
    let df = create_multivalue_target_dataframe();
    let mapping = TargetMapping::new("CRC", "not_a_value");
    let err = binary_labels(&df, "status", Some(&mapping)).unwrap_err();
    assert!(err.to_string().contains("both classes"));
}

#[test]
fn test_build_task_excludes_unmapped_samples() {
    let df = create_multivalue_target_dataframe();
    let spec = TaskSpec {
        target: "status".to_string(),
        mapping: Some(TargetMapping::new("CRC", "healthy")),
        id_column: None,
        drop_columns: Vec::new(),
        abundance: AbundanceConfig {
            min_prevalence: 0.0,
            ..AbundanceConfig::default()
        },
    };

    let (task, summary) = build_task(&df, Path::new("phenotypes.csv"), &spec).unwrap();

    assert_eq!(summary.input_rows, 12);
    assert_eq!(summary.excluded_rows, 3);
    assert_eq!(task.n_samples(), 9);
    assert_eq!(task.positive_label, "CRC");
    assert_eq!(task.negative_label, "healthy");
    assert_eq!(task.id, "phenotypes");
    // Row indices stand in for sample ids without an id column
    assert_eq!(task.sample_ids[2], "3");
}

#[test]
fn test_missing_target_column() {
    let df = create_multivalue_target_dataframe();
    assert!(analyze_target_column(&df, "diagnosis").is_err());
}
