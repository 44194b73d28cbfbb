//! microdx: Microbiome Classifier Benchmark Library
//!
//! Trains several binary classifiers on a microbiome abundance table,
//! tunes each with cross-validated random search, evaluates them on a
//! stratified holdout and explains them with permutation importance.

pub mod cli;
pub mod learners;
pub mod pipeline;
pub mod report;
pub mod utils;
