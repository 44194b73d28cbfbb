//! `microdx inspect`: describe a table without training anything

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Table};
use polars::prelude::*;

use crate::pipeline::target::column_to_string_vec;
use crate::pipeline::{extract_abundances, load_dataset_with_progress, prevalence, select_feature_columns};
use crate::utils::{print_banner, print_count, print_info, print_step_header, print_success};

const TOP_PREVALENT: usize = 10;

/// Prevalence distribution over all numeric columns
#[derive(Debug, Clone)]
pub struct PrevalenceSummary {
    pub threshold: f64,
    pub median: f64,
    /// Taxa at or above `threshold`
    pub retained: usize,
    /// Taxa never observed
    pub absent: usize,
    /// Most prevalent taxa, descending
    pub top: Vec<(String, f64)>,
}

#[derive(Debug, Clone)]
pub struct InspectReport {
    pub n_samples: usize,
    pub n_taxa: usize,
    pub skipped_columns: Vec<String>,
    /// Value counts of the target column, nulls under "(null)"
    pub class_balance: Option<BTreeMap<String, usize>>,
    pub prevalence: PrevalenceSummary,
}

/// Compute the inspection report for a loaded frame
pub fn inspect_table(
    df: &DataFrame,
    target: Option<&str>,
    id_column: Option<&str>,
    drop_columns: &[String],
    min_prevalence: f64,
) -> Result<InspectReport> {
    if let Some(id_col) = id_column {
        if df.column(id_col).is_err() {
            anyhow::bail!("Id column '{}' not found in dataset", id_col);
        }
    }

    let class_balance = match target {
        Some(name) => {
            let col = df
                .column(name)
                .with_context(|| format!("Target column '{}' not found", name))?;
            let mut counts = BTreeMap::new();
            for value in column_to_string_vec(col)? {
                *counts
                    .entry(value.unwrap_or_else(|| "(null)".to_string()))
                    .or_insert(0) += 1;
            }
            Some(counts)
        }
        None => None,
    };

    let mut excluded: Vec<&str> = drop_columns.iter().map(String::as_str).collect();
    excluded.extend(target);
    excluded.extend(id_column);
    let columns = select_feature_columns(df, &excluded);

    let rows: Vec<usize> = (0..df.height()).collect();
    let raw = extract_abundances(df, &columns.numeric, &rows)?;
    let prev = prevalence(&raw);

    let mut sorted: Vec<f64> = prev.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let median = match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[n / 2],
        n => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    };

    let mut ranked: Vec<(String, f64)> = columns.numeric.iter().cloned().zip(prev.iter().copied()).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(TOP_PREVALENT);

    Ok(InspectReport {
        n_samples: df.height(),
        n_taxa: columns.numeric.len(),
        skipped_columns: columns.skipped,
        class_balance,
        prevalence: PrevalenceSummary {
            threshold: min_prevalence,
            median,
            retained: prev.iter().filter(|&&p| p >= min_prevalence).count(),
            absent: prev.iter().filter(|&&p| p == 0.0).count(),
            top: ranked,
        },
    })
}

fn print_table(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

/// Load `input` and print its inspection report
pub fn run_inspect(
    input: &Path,
    target: Option<&str>,
    id_column: Option<&str>,
    min_prevalence: f64,
    drop_columns: &[String],
    infer_schema_length: usize,
) -> Result<()> {
    print_banner(env!("CARGO_PKG_VERSION"));

    print_step_header(1, "Loading Dataset");
    let (df, rows, cols, memory_mb) = load_dataset_with_progress(input, infer_schema_length)?;
    print_info(&format!("{} rows × {} columns ({:.1} MB)", rows, cols, memory_mb));

    let report = inspect_table(&df, target, id_column, drop_columns, min_prevalence)?;

    print_step_header(2, "Table Overview");
    print_count("samples", report.n_samples, None);
    print_count(
        "taxa",
        report.n_taxa,
        Some(&format!("({} non-numeric columns skipped)", report.skipped_columns.len())),
    );

    if let (Some(name), Some(balance)) = (target, &report.class_balance) {
        println!();
        print_info(&format!("Class balance of '{}'", name));
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Value").add_attribute(Attribute::Bold),
            Cell::new("Samples").add_attribute(Attribute::Bold),
            Cell::new("Share").add_attribute(Attribute::Bold),
        ]);
        for (value, count) in balance {
            let share = *count as f64 / report.n_samples.max(1) as f64;
            table.add_row(vec![
                Cell::new(value),
                Cell::new(count).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.1}%", share * 100.0)).set_alignment(CellAlignment::Right),
            ]);
        }
        print_table(&table);
    }

    print_step_header(3, "Prevalence");
    let prev = &report.prevalence;
    print_info(&format!("Median prevalence: {:.1}%", prev.median * 100.0));
    print_count(
        "taxa",
        prev.retained,
        Some(&format!("at or above {:.0}% prevalence", prev.threshold * 100.0)),
    );
    print_count("taxa", prev.absent, Some("never observed"));

    if !prev.top.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Taxon").add_attribute(Attribute::Bold),
            Cell::new("Prevalence").add_attribute(Attribute::Bold),
        ]);
        for (name, p) in &prev.top {
            table.add_row(vec![
                Cell::new(name),
                Cell::new(format!("{:.1}%", p * 100.0)).set_alignment(CellAlignment::Right),
            ]);
        }
        println!();
        print_table(&table);
    }

    println!();
    print_success("Inspection complete");
    Ok(())
}
