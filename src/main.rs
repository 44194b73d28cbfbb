//! microdx: Microbiome Classifier Benchmark CLI
//!
//! Compares tuned classifiers on a microbiome abundance table and
//! reports holdout performance and feature importance.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;

use microdx::cli::{self, Cli, Commands};
use microdx::pipeline::{
    analyze_target_column, build_task, get_column_names, load_dataset_with_progress,
    run_benchmark, DataSummary, TargetAnalysis, TargetMapping, TaskSpec,
};
use microdx::report::{
    bundle_artifacts, export_importance_csv, export_model_comparison, export_predictions_csv,
    plot_importance, plot_performance, plot_roc_curves, print_data_summary, print_importance,
    print_model_comparison, ReportMetadata, ReportPaths,
};
use microdx::utils::{
    create_spinner, finish_with_success, init_logging, print_banner, print_completion,
    print_config, print_count, print_info, print_step_header, print_step_time, print_success,
    print_warning, ConfigCard,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Handle subcommands
    if let Some(command) = &cli.command {
        return match command {
            Commands::Inspect {
                input,
                target,
                id_column,
                min_prevalence,
                drop_columns,
                infer_schema_length,
            } => cli::run_inspect(
                input,
                target.as_deref(),
                id_column.as_deref(),
                *min_prevalence,
                drop_columns,
                *infer_schema_length,
            ),
        };
    }

    // Main benchmark pipeline - require input
    let input = cli.input.clone().ok_or_else(|| {
        anyhow::anyhow!("Input file is required. Use -i/--input to specify a file.")
    })?;
    let output_dir = cli
        .output_dir()
        .unwrap_or_else(|| cli::default_output_dir(&input));
    let flag_mapping = cli.target_mapping().map_err(anyhow::Error::msg)?;
    let config = cli.run_config();

    let target = match &cli.target {
        Some(target) => target.clone(),
        None if cli.no_confirm => anyhow::bail!(
            "Target column is required when using --no-confirm. Use -t/--target to specify."
        ),
        None => {
            let columns = get_column_names(&input, cli.infer_schema_length)?;
            cli::select_target_column(&columns)?
        }
    };

    print_banner(env!("CARGO_PKG_VERSION"));

    let model_names = config
        .ordered_models()
        .iter()
        .map(|m| m.name())
        .collect::<Vec<_>>()
        .join(", ");
    let measure_name = config.tune.measure.to_string();
    let normalization_name = config.abundance.normalization.to_string();
    print_config(&ConfigCard {
        input: &input,
        target: &target,
        output_dir: &output_dir,
        models: &model_names,
        measure: &measure_name,
        n_evals: config.tune.n_evals,
        folds: config.tune.folds,
        test_ratio: config.test_ratio,
        normalization: &normalization_name,
        min_prevalence: config.abundance.min_prevalence,
        seed: config.tune.seed,
    });

    // Step 1: Load dataset
    print_step_header(1, "Load Dataset");
    let step_start = Instant::now();
    let (df, rows, cols, memory_mb) = load_dataset_with_progress(&input, cli.infer_schema_length)?;

    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", rows);
    println!("      Columns: {}", cols);
    println!("      Estimated memory: {:.2} MB", memory_mb);

    let column_names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    if !column_names.contains(&target) {
        anyhow::bail!(
            "Target column '{}' not found in dataset. Available columns: {:?}",
            target,
            column_names
        );
    }
    print_step_time(step_start.elapsed());

    // Step 2: Target and abundance preprocessing
    print_step_header(2, "Build Task");
    let step_start = Instant::now();

    let mapping = resolve_target_mapping(&df, &target, flag_mapping, cli.no_confirm)?;
    if let Some(m) = &mapping {
        print_info(&format!(
            "Mapping '{}' → 1 (event), '{}' → 0 (non-event)",
            m.event_value, m.non_event_value
        ));
    }

    let spec = TaskSpec {
        target: target.clone(),
        mapping: mapping.clone(),
        id_column: cli.id_column.clone(),
        drop_columns: cli.drop_columns.clone(),
        abundance: config.abundance.clone(),
    };
    let spinner = create_spinner("Normalizing and filtering abundances...");
    let (task, data_summary) = build_task(&df, &input, &spec)?;
    finish_with_success(&spinner, "Task built");
    drop(df);

    report_task(&data_summary);
    print_step_time(step_start.elapsed());

    // Step 3: Holdout split
    print_step_header(3, "Stratified Holdout Split");
    let step_start = Instant::now();
    let (train, test) = task.stratified_holdout(config.test_ratio, config.tune.seed)?;
    let (train_counts, test_counts) = (train.class_counts(), test.class_counts());
    print_count(
        "training samples",
        train.n_samples(),
        Some(&format!("({} event / {} non-event)", train_counts.positive, train_counts.negative)),
    );
    print_count(
        "holdout samples",
        test.n_samples(),
        Some(&format!("({} event / {} non-event)", test_counts.positive, test_counts.negative)),
    );
    train.check_folds(config.tune.folds)?;
    print_step_time(step_start.elapsed());

    // Step 4: Tune, refit, evaluate and explain every model
    print_step_header(4, "Benchmark Models");
    let step_start = Instant::now();
    let result = run_benchmark(&train, &test, &config, true)?;

    let n_failed = result.failed().count();
    if n_failed == 0 {
        print_success(&format!("All {} model(s) evaluated", result.models.len()));
    } else {
        print_warning(&format!(
            "{} of {} model(s) failed",
            n_failed,
            result.models.len()
        ));
    }
    if result.successful().next().is_none() {
        anyhow::bail!("Every model failed; see the errors above");
    }
    match result.best_model {
        Some(best) => print_success(&format!("Best model: {}", best)),
        None => print_info("No non-baseline model succeeded"),
    }
    print_step_time(step_start.elapsed());

    // Step 5: Reports
    print_step_header(5, "Save Reports");
    let step_start = Instant::now();
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("microdx");
    let paths = ReportPaths::new(&output_dir, stem);
    let metadata = ReportMetadata::new(&input, &target, mapping, cli.id_column.clone(), config.clone());

    let mut written: Vec<PathBuf> = Vec::new();
    let spinner = create_spinner("Writing reports...");
    export_model_comparison(&paths.comparison_json, &metadata, &data_summary, &result)?;
    written.push(paths.comparison_json.clone());
    export_importance_csv(&paths.importance_csv, &result)?;
    written.push(paths.importance_csv.clone());
    export_predictions_csv(&paths.predictions_csv, &result)?;
    written.push(paths.predictions_csv.clone());

    if !cli.no_plots {
        plot_roc_curves(&result, &paths.roc_svg)?;
        written.push(paths.roc_svg.clone());
        plot_performance(&result, &paths.performance_svg)?;
        written.push(paths.performance_svg.clone());
        if !result.aggregate_importance.is_empty() {
            plot_importance(&result.aggregate_importance, config.top_features, &paths.importance_svg)?;
            written.push(paths.importance_svg.clone());
        }
    }

    if cli.bundle {
        let files: Vec<&Path> = written.iter().map(PathBuf::as_path).collect();
        bundle_artifacts(&files, &paths.bundle_zip)?;
        written.push(paths.bundle_zip.clone());
    }
    finish_with_success(&spinner, &format!("Saved {} file(s)", written.len()));

    for path in &written {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        println!("      {} {}", style("•").dim(), name);
    }
    print_info(&format!("Output directory: {}", output_dir.display()));
    print_step_time(step_start.elapsed());

    // Display summary
    print_data_summary(&data_summary);
    print_model_comparison(&result, config.tune.measure);
    print_importance(&result.aggregate_importance, config.top_features);

    print_completion();

    Ok(())
}

/// Use the flag mapping if given, else inspect the target and ask when it is not 0/1
fn resolve_target_mapping(
    df: &polars::prelude::DataFrame,
    target: &str,
    flag_mapping: Option<TargetMapping>,
    no_confirm: bool,
) -> Result<Option<TargetMapping>> {
    if flag_mapping.is_some() {
        return Ok(flag_mapping);
    }

    match analyze_target_column(df, target)? {
        TargetAnalysis::AlreadyBinary => {
            print_info("Target is already binary (0/1)");
            Ok(None)
        }
        TargetAnalysis::NeedsMapping { unique_values } => {
            if no_confirm {
                anyhow::bail!(
                    "Target column '{}' is not binary 0/1 (values: {:?}). \
                     Use --event-value and --non-event-value to map it.",
                    target,
                    unique_values
                );
            }
            print_count("distinct target value(s)", unique_values.len(), None);
            Ok(Some(cli::select_target_mapping(target, &unique_values)?))
        }
    }
}

fn report_task(summary: &DataSummary) {
    if summary.excluded_rows > 0 {
        print_count(
            "row(s) excluded",
            summary.excluded_rows,
            Some("(target null or outside the mapping)"),
        );
    }
    print_count(
        "sample(s)",
        summary.n_samples,
        Some(&format!(
            "({} event / {} non-event)",
            summary.class_counts.positive, summary.class_counts.negative
        )),
    );
    if !summary.dropped_low_prevalence.is_empty() {
        print_count("low-prevalence taxa dropped", summary.dropped_low_prevalence.len(), None);
    }
    if !summary.dropped_constant.is_empty() {
        print_count("constant taxa dropped", summary.dropped_constant.len(), None);
    }
    print_success(&format!("{} feature(s) kept", summary.n_features));
}
