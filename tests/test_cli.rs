//! Tests for CLI argument parsing and the microdx binary

use assert_cmd::Command;
use clap::Parser;
use microdx::cli::{Cli, Commands};
use microdx::learners::LearnerKind;
use microdx::pipeline::Measure;
use predicates::prelude::*;
use std::path::PathBuf;

mod common;

fn microdx() -> Command {
    Command::cargo_bin("microdx").unwrap()
}

#[test]
fn test_cli_default_values() {
    let cli = Cli::parse_from(["microdx", "-i", "data.csv", "-t", "status"]);

    assert_eq!(cli.test_ratio, 0.25, "Default holdout should be 25%");
    assert_eq!(cli.min_prevalence, 0.1, "Default prevalence should be 10%");
    assert_eq!(cli.importance_repeats, 5);
    assert_eq!(cli.top_features, 20);
    assert_eq!(cli.seed, 42);
    assert!(cli.models.is_empty(), "No --models means every model");
    assert!(!cli.no_confirm, "Default no_confirm should be false");
    assert!(!cli.bundle && !cli.no_plots);
    assert_eq!(cli.infer_schema_length, 10000);
}

#[test]
fn test_cli_custom_values() {
    let cli = Cli::parse_from([
        "microdx",
        "-i",
        "/data/crc.parquet",
        "-t",
        "status",
        "-o",
        "/tmp/out",
        "--measure",
        "balanced_accuracy",
        "--models",
        "knn,nb",
        "--drop-columns",
        "age,bmi",
    ]);

    assert_eq!(cli.measure, Measure::BalancedAccuracy);
    assert_eq!(cli.models, vec![LearnerKind::Knn, LearnerKind::NaiveBayes]);
    assert_eq!(cli.drop_columns, vec!["age", "bmi"]);
    assert_eq!(cli.output_dir(), Some(PathBuf::from("/tmp/out")));
    assert_eq!(cli.run_config().tune.measure, Measure::BalancedAccuracy);
}

#[test]
fn test_inspect_subcommand_parses() {
    let cli = Cli::parse_from(["microdx", "inspect", "crc.csv", "-t", "status", "--id-column", "sample_id"]);
    match cli.command {
        Some(Commands::Inspect {
            input, target, id_column, ..
        }) => {
            assert_eq!(input, PathBuf::from("crc.csv"));
            assert_eq!(target.as_deref(), Some("status"));
            assert_eq!(id_column.as_deref(), Some("sample_id"));
        }
        None => panic!("expected the inspect subcommand"),
    }
}

#[test]
fn test_binary_requires_input() {
    microdx()
        .arg("--no-confirm")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file is required"));
}

#[test]
fn test_binary_requires_target_without_prompts() {
    let mut df = common::create_abundance_dataframe(20, 1);
    let (_dir, csv_path) = common::create_temp_csv(&mut df);

    microdx()
        .arg("-i")
        .arg(&csv_path)
        .arg("--no-confirm")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Target column is required"));
}

#[test]
fn test_binary_rejects_unmapped_string_target() {
    let mut df = common::create_abundance_dataframe(20, 1);
    let (_dir, csv_path) = common::create_temp_csv(&mut df);

    microdx()
        .arg("-i")
        .arg(&csv_path)
        .args(["-t", "status", "--no-confirm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--event-value"));
}

#[test]
fn test_binary_full_run_writes_artifacts() {
    let mut df = common::create_abundance_dataframe(40, 9);
    let (dir, csv_path) = common::create_temp_csv(&mut df);
    let out_dir = dir.path().join("results");

    microdx()
        .arg("-i")
        .arg(&csv_path)
        .arg("-o")
        .arg(&out_dir)
        .args([
            "-t",
            "status",
            "--event-value",
            "CRC",
            "--non-event-value",
            "healthy",
            "--id-column",
            "sample_id",
            "--models",
            "featureless,logistic,tree",
            "--n-evals",
            "2",
            "--folds",
            "3",
            "--importance-repeats",
            "2",
            "--bundle",
            "--no-confirm",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("MODEL COMPARISON"));

    for name in [
        "abundance_model_comparison.json",
        "abundance_importance.csv",
        "abundance_predictions.csv",
        "abundance_roc.svg",
        "abundance_performance.svg",
        "abundance_importance.svg",
        "abundance_results.zip",
    ] {
        assert!(out_dir.join(name).exists(), "missing artifact {}", name);
    }
}

#[test]
fn test_binary_no_plots_on_binary_target() {
    let mut df = common::create_binary_abundance_dataframe(24, 4);
    let (dir, csv_path) = common::create_temp_csv(&mut df);

    microdx()
        .arg("-i")
        .arg(&csv_path)
        .args([
            "-t",
            "label",
            "--models",
            "naive_bayes",
            "--n-evals",
            "2",
            "--folds",
            "2",
            "--no-plots",
            "--no-confirm",
        ])
        .assert()
        .success();

    let out_dir = dir.path().join("abundance_results");
    assert!(out_dir.join("abundance_model_comparison.json").exists());
    assert!(!out_dir.join("abundance_roc.svg").exists());
    assert!(!out_dir.join("abundance_results.zip").exists());
}

#[test]
fn test_inspect_prints_prevalence() {
    let mut df = common::create_abundance_dataframe(20, 2);
    let (_dir, csv_path) = common::create_temp_csv(&mut df);

    microdx()
        .arg("inspect")
        .arg(&csv_path)
        .args(["-t", "status", "--id-column", "sample_id"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Inspection complete"))
        .stdout(predicate::str::contains("taxon_up"));
}
