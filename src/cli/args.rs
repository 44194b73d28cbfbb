//! Command-line argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::learners::LearnerKind;
use crate::pipeline::{AbundanceConfig, Measure, Normalization, RunConfig, TargetMapping, TuneConfig};

/// microdx - Compare tuned classifiers on microbiome abundance tables
#[derive(Parser, Debug)]
#[command(name = "microdx")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Input file path (CSV or Parquet): one row per sample, one column per taxon
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Outcome column (condition detected or not).
    /// If not provided, will be selected interactively from available columns.
    #[arg(short, long)]
    pub target: Option<String>,

    /// Value in target column that represents EVENT (maps to 1).
    /// Required with --non-event-value when target is not binary 0/1.
    #[arg(long)]
    pub event_value: Option<String>,

    /// Value in target column that represents NON-EVENT (maps to 0).
    /// Required with --event-value when target is not binary 0/1.
    #[arg(long)]
    pub non_event_value: Option<String>,

    /// Column holding sample identifiers, used in the predictions export
    #[arg(long)]
    pub id_column: Option<String>,

    /// Columns to ignore (comma-separated), e.g. metadata
    #[arg(long, value_delimiter = ',')]
    pub drop_columns: Vec<String>,

    /// Output directory. Defaults to '<input dir>/<stem>_results'
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Models to compare (comma-separated). Default: all.
    /// Options: featureless, logistic, tree, forest, boosting, knn, naive_bayes
    #[arg(long, value_delimiter = ',')]
    pub models: Vec<LearnerKind>,

    /// Measure optimized during tuning and used to pick the best model
    #[arg(long, default_value = "auc")]
    pub measure: Measure,

    /// Random-search trials per model
    #[arg(long, default_value = "20", value_parser = validate_positive)]
    pub n_evals: usize,

    /// Inner cross-validation folds
    #[arg(long, default_value = "5", value_parser = validate_folds)]
    pub folds: usize,

    /// Fraction of samples held out for the final evaluation (0.05 to 0.5)
    #[arg(long, default_value = "0.25", value_parser = validate_test_ratio)]
    pub test_ratio: f64,

    /// Abundance normalization: none, relative, log or clr
    #[arg(long, default_value = "relative")]
    pub normalization: Normalization,

    /// Pseudocount added before log and clr transforms
    #[arg(long, default_value = "1e-6", value_parser = validate_pseudocount)]
    pub pseudocount: f64,

    /// Drop taxa present (> 0) in fewer than this fraction of samples
    #[arg(long, default_value = "0.1", value_parser = validate_fraction)]
    pub min_prevalence: f64,

    /// Permutation repeats per feature for importance
    #[arg(long, default_value = "5", value_parser = validate_positive)]
    pub importance_repeats: usize,

    /// Number of features shown in tables and plots
    #[arg(long, default_value = "20", value_parser = validate_positive)]
    pub top_features: usize,

    /// Random seed for splits, search and permutations
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Skip the SVG plots
    #[arg(long, default_value = "false")]
    pub no_plots: bool,

    /// Also write a zip archive with every artifact
    #[arg(long, default_value = "false")]
    pub bundle: bool,

    /// Skip interactive prompts; missing choices become errors
    #[arg(long, default_value = "false")]
    pub no_confirm: bool,

    /// Number of rows to use for schema inference (CSV only)
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,

    /// Debug diagnostics on stderr (RUST_LOG overrides)
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarize a table without training: samples, taxa, class balance, prevalence
    Inspect {
        /// Input file path (CSV or Parquet)
        input: PathBuf,

        /// Optional outcome column to report class balance for
        #[arg(short, long)]
        target: Option<String>,

        /// Column holding sample identifiers, excluded from the taxa
        #[arg(long)]
        id_column: Option<String>,

        /// Prevalence threshold to report against
        #[arg(long, default_value = "0.1", value_parser = validate_fraction)]
        min_prevalence: f64,

        /// Columns to ignore (comma-separated)
        #[arg(long, value_delimiter = ',')]
        drop_columns: Vec<String>,

        /// Number of rows to use for schema inference (CSV only)
        #[arg(long, default_value = "10000")]
        infer_schema_length: usize,
    },
}

impl Cli {
    /// Output directory, deriving `<input dir>/<stem>_results` when not given
    pub fn output_dir(&self) -> Option<PathBuf> {
        let input = self.input.as_ref()?;
        Some(
            self.output_dir
                .clone()
                .unwrap_or_else(|| default_output_dir(input)),
        )
    }

    /// Target mapping from the flags; both values or neither must be given
    pub fn target_mapping(&self) -> Result<Option<TargetMapping>, String> {
        match (&self.event_value, &self.non_event_value) {
            (Some(event), Some(non_event)) => {
                if event == non_event {
                    return Err("--event-value and --non-event-value must differ".to_string());
                }
                Ok(Some(TargetMapping::new(event.clone(), non_event.clone())))
            }
            (None, None) => Ok(None),
            _ => Err("--event-value and --non-event-value must be given together".to_string()),
        }
    }

    /// Freeze the run settings
    pub fn run_config(&self) -> RunConfig {
        let models = if self.models.is_empty() {
            LearnerKind::ALL.to_vec()
        } else {
            self.models.clone()
        };

        RunConfig {
            models,
            tune: TuneConfig::new()
                .with_n_evals(self.n_evals)
                .with_folds(self.folds)
                .with_measure(self.measure)
                .with_seed(self.seed),
            test_ratio: self.test_ratio,
            abundance: AbundanceConfig {
                normalization: self.normalization,
                pseudocount: self.pseudocount,
                min_prevalence: self.min_prevalence,
            },
            importance_repeats: self.importance_repeats,
            top_features: self.top_features,
        }
    }
}

/// `<input dir>/<stem>_results`
pub fn default_output_dir(input: &Path) -> PathBuf {
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("microdx");
    parent.join(format!("{}_results", stem))
}

fn parse_f64(s: &str) -> Result<f64, String> {
    s.parse()
        .map_err(|_| format!("'{}' is not a valid number", s))
}

fn validate_positive(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid count", s))?;
    if value == 0 {
        Err("value must be at least 1".to_string())
    } else {
        Ok(value)
    }
}

fn validate_folds(s: &str) -> Result<usize, String> {
    let value = validate_positive(s)?;
    if value < 2 {
        Err(format!("folds must be at least 2, got {}", value))
    } else {
        Ok(value)
    }
}

fn validate_test_ratio(s: &str) -> Result<f64, String> {
    let value = parse_f64(s)?;
    if !(0.05..=0.5).contains(&value) {
        Err(format!("test_ratio must be between 0.05 and 0.5, got {}", value))
    } else {
        Ok(value)
    }
}

fn validate_fraction(s: &str) -> Result<f64, String> {
    let value = parse_f64(s)?;
    if !(0.0..=1.0).contains(&value) {
        Err(format!("value must be between 0.0 and 1.0, got {}", value))
    } else {
        Ok(value)
    }
}

fn validate_pseudocount(s: &str) -> Result<f64, String> {
    let value = parse_f64(s)?;
    if !(value > 0.0 && value.is_finite()) {
        Err(format!("pseudocount must be positive, got {}", value))
    } else {
        Ok(value)
    }
}
