//! Static SVG plots of a benchmark run

use std::path::Path;

use anyhow::{anyhow, Result};
use plotters::prelude::*;

use crate::pipeline::{AggregateImportance, BenchmarkResult};

const WIDTH: u32 = 900;
const HEIGHT: u32 = 650;
const FONT: &str = "sans-serif";

/// Tableau-style categorical palette
const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

fn plot_err<E: std::fmt::Display>(e: E) -> anyhow::Error {
    anyhow!("Plotting failed: {}", e)
}

fn color_for(idx: usize) -> RGBColor {
    PALETTE[idx % PALETTE.len()]
}

/// Holdout ROC curves of every successful model
pub fn plot_roc_curves(result: &BenchmarkResult, path: &Path) -> Result<()> {
    let root = SVGBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("ROC curves (holdout)", (FONT, 22).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(0.0..1.0, 0.0..1.0)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("False positive rate")
        .y_desc("True positive rate")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(vec![(0.0, 0.0), (1.0, 1.0)], &RGBColor(200, 200, 200)))
        .map_err(plot_err)?;

    for (idx, model) in result.successful().enumerate() {
        let color = color_for(idx);
        let auc = model.test_metrics.map(|m| m.auc).unwrap_or(f64::NAN);
        chart
            .draw_series(LineSeries::new(model.roc.iter().copied(), color.stroke_width(2)))
            .map_err(plot_err)?
            .label(format!("{} (AUC {:.3})", model.learner, auc))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(&WHITE.mix(0.85))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Holdout AUC per model as vertical bars, best model highlighted
pub fn plot_performance(result: &BenchmarkResult, path: &Path) -> Result<()> {
    let models: Vec<_> = result.successful().collect();
    let names: Vec<String> = models.iter().map(|m| m.learner.to_string()).collect();
    let aucs: Vec<f64> = models
        .iter()
        .map(|m| m.test_metrics.map(|t| t.auc).unwrap_or(0.0))
        .collect();

    let root = SVGBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Holdout AUC by model", (FONT, 22).into_font())
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(55)
        .build_cartesian_2d((0..names.len().max(1)).into_segmented(), 0.0..1.0)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("AUC")
        .x_label_formatter(&|x| match x {
            SegmentValue::CenterOf(idx) => names.get(*idx).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(models.iter().zip(aucs.iter()).enumerate().map(|(i, (model, &auc))| {
            let color = if result.best_model == Some(model.learner) {
                PALETTE[2]
            } else if model.is_baseline {
                PALETTE[7]
            } else {
                PALETTE[0]
            };
            let mut bar = Rectangle::new(
                [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), auc)],
                color.filled(),
            );
            bar.set_margin(0, 0, 8, 8);
            bar
        }))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Top-N aggregated permutation importance as horizontal bars
pub fn plot_importance(aggregate: &[AggregateImportance], top_n: usize, path: &Path) -> Result<()> {
    let rows: Vec<&AggregateImportance> = aggregate.iter().take(top_n).collect();
    // Most important on top
    let names: Vec<&str> = rows.iter().rev().map(|r| r.feature.as_str()).collect();
    let scores: Vec<f64> = rows.iter().rev().map(|r| r.mean_importance).collect();

    let max_score = scores.iter().cloned().fold(0.0, f64::max);
    let min_score = scores.iter().cloned().fold(0.0, f64::min);
    let x_max = if max_score > 0.0 { max_score * 1.1 } else { 1e-3 };
    let x_min = if min_score < 0.0 { min_score * 1.1 } else { 0.0 };

    let height = HEIGHT.max(120 + 22 * names.len() as u32);
    let root = SVGBackend::new(path, (WIDTH, height)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Permutation importance (mean AUC drop)", (FONT, 22).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(220)
        .build_cartesian_2d(x_min..x_max, (0..names.len().max(1)).into_segmented())
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_desc("Mean AUC drop")
        .y_label_formatter(&|y| match y {
            SegmentValue::CenterOf(idx) => names.get(*idx).copied().unwrap_or("").to_string(),
            _ => String::new(),
        })
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(scores.iter().enumerate().map(|(i, &score)| {
            let color = if score >= 0.0 { PALETTE[0] } else { PALETTE[3] };
            let mut bar = Rectangle::new(
                [(0.0, SegmentValue::Exact(i)), (score, SegmentValue::Exact(i + 1))],
                color.filled(),
            );
            bar.set_margin(2, 2, 0, 0);
            bar
        }))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}
