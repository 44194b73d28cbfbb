//! Report module - console tables, exports, plots and the zip bundle

pub mod bundle;
pub mod export;
pub mod plots;
pub mod summary;

pub use bundle::*;
pub use export::*;
pub use plots::*;
pub use summary::*;

use std::path::{Path, PathBuf};

/// Artifact paths under the output directory, all prefixed with the input stem
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub comparison_json: PathBuf,
    pub importance_csv: PathBuf,
    pub predictions_csv: PathBuf,
    pub roc_svg: PathBuf,
    pub performance_svg: PathBuf,
    pub importance_svg: PathBuf,
    pub bundle_zip: PathBuf,
}

impl ReportPaths {
    pub fn new(output_dir: &Path, stem: &str) -> Self {
        let file = |suffix: &str| output_dir.join(format!("{}_{}", stem, suffix));
        Self {
            comparison_json: file("model_comparison.json"),
            importance_csv: file("importance.csv"),
            predictions_csv: file("predictions.csv"),
            roc_svg: file("roc.svg"),
            performance_svg: file("performance.svg"),
            importance_svg: file("importance.svg"),
            bundle_zip: file("results.zip"),
        }
    }
}
