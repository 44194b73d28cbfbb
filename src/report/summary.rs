//! Console summary tables

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::pipeline::{AggregateImportance, BenchmarkResult, DataSummary, Measure};

fn section_title(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

fn fmt_metric(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.3}", v),
        _ => "-".to_string(),
    }
}

/// Table of what preprocessing kept and dropped
pub fn data_summary_table(summary: &DataSummary) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Metric").add_attribute(Attribute::Bold),
        Cell::new("Value").add_attribute(Attribute::Bold),
    ]);

    let red_if_any = |n: usize| if n == 0 { Color::White } else { Color::Red };

    table.add_row(vec![Cell::new("📁 Input rows"), Cell::new(summary.input_rows)]);
    table.add_row(vec![
        Cell::new("🚫 Excluded rows (target)"),
        Cell::new(summary.excluded_rows).fg(red_if_any(summary.excluded_rows)),
    ]);
    table.add_row(vec![
        Cell::new("🧪 Samples"),
        Cell::new(format!(
            "{} ({} event / {} non-event)",
            summary.n_samples, summary.class_counts.positive, summary.class_counts.negative
        )),
    ]);
    table.add_row(vec![Cell::new("🦠 Candidate taxa"), Cell::new(summary.candidate_features)]);
    table.add_row(vec![
        Cell::new("🗑️  Dropped (prevalence)"),
        Cell::new(summary.dropped_low_prevalence.len())
            .fg(red_if_any(summary.dropped_low_prevalence.len())),
    ]);
    table.add_row(vec![
        Cell::new("📏 Dropped (constant)"),
        Cell::new(summary.dropped_constant.len()).fg(red_if_any(summary.dropped_constant.len())),
    ]);
    table.add_row(vec![
        Cell::new("✅ Features used"),
        Cell::new(summary.n_features)
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
    ]);
    table
}

pub fn print_data_summary(summary: &DataSummary) {
    section_title("📋", "DATA SUMMARY");
    print_indented(&data_summary_table(summary));

    if !summary.skipped_columns.is_empty() {
        println!();
        println!(
            "      {} {}: {}",
            style("Skipped non-numeric columns").yellow(),
            style(format!("({})", summary.skipped_columns.len())).dim(),
            summary.skipped_columns.join(", ")
        );
    }
}

/// One row per successful model, best model marked with a star
pub fn model_comparison_table(result: &BenchmarkResult, measure: Measure) -> Table {
    let cv_header = format!("CV {}", measure);
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(
        [
            "Model",
            cv_header.as_str(),
            "AUC",
            "Acc",
            "BAcc",
            "Sens",
            "Spec",
            "F1",
            "Brier",
            "Time",
        ]
        .iter()
        .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
        .collect::<Vec<_>>(),
    );

    for model in result.successful() {
        let Some(m) = &model.test_metrics else { continue };
        let is_best = result.best_model == Some(model.learner);

        let mut name = Cell::new(if is_best {
            format!("★ {}", model.learner)
        } else {
            model.learner.to_string()
        });
        if is_best {
            name = name.fg(Color::Green).add_attribute(Attribute::Bold);
        } else if model.is_baseline {
            name = name.fg(Color::DarkGrey);
        }

        let cv = match (model.cv_mean, model.cv_sd) {
            (Some(mean), Some(sd)) => format!("{:.3} ± {:.3}", mean, sd),
            _ => "-".to_string(),
        };

        let numeric = |v: f64| Cell::new(fmt_metric(Some(v))).set_alignment(CellAlignment::Right);
        table.add_row(vec![
            name,
            Cell::new(cv).set_alignment(CellAlignment::Right),
            numeric(m.auc),
            numeric(m.accuracy),
            numeric(m.balanced_accuracy),
            numeric(m.sensitivity),
            numeric(m.specificity),
            numeric(m.f1),
            numeric(m.brier),
            Cell::new(format!("{:.1}s", model.timings.total_secs)).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

pub fn print_model_comparison(result: &BenchmarkResult, measure: Measure) {
    section_title("🏁", "MODEL COMPARISON (holdout)");
    print_indented(&model_comparison_table(result, measure));

    let failed: Vec<_> = result.failed().collect();
    if !failed.is_empty() {
        println!();
        println!(
            "      {} {}:",
            style("Failed models").red(),
            style(format!("({})", failed.len())).dim()
        );
        for model in failed {
            println!(
                "        {} {}: {}",
                style("•").dim(),
                model.learner,
                model.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

/// Top-N features by mean rank across models
pub fn importance_table(aggregate: &[AggregateImportance], top_n: usize) -> Table {
    let top_header = format!("Top-{}", top_n);
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(
        ["#", "Feature", "Mean ΔAUC", "Mean rank", top_header.as_str()]
            .iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );

    for (i, row) in aggregate.iter().take(top_n).enumerate() {
        let imp_color = if row.mean_importance > 0.0 { Color::Green } else { Color::DarkGrey };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&row.feature),
            Cell::new(format!("{:.4}", row.mean_importance))
                .fg(imp_color)
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}", row.mean_rank)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{}/{}", row.top_n_count, row.n_models)).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

pub fn print_importance(aggregate: &[AggregateImportance], top_n: usize) {
    section_title("🔬", "FEATURE IMPORTANCE (permutation, all models)");
    if aggregate.is_empty() {
        println!("      {}", style("No model could be explained").dim());
        return;
    }
    print_indented(&importance_table(aggregate, top_n));
}
