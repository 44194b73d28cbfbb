//! The comparison loop: tune, refit, evaluate and explain every learner

use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;

use super::abundance::AbundanceConfig;
use super::importance::{aggregate_importance, permutation_importance, AggregateImportance, FeatureImportance};
use super::metrics::{roc_curve, BinaryMetrics};
use super::search::{tune_with_progress, Trial, TuneConfig};
use super::task::ClassificationTask;
use crate::learners::{check_probabilities, LearnerKind, ParamSet};
use crate::utils::{create_progress_bar, finish_with_success, finish_with_warning};

/// Frozen settings of one run, written into the report
#[derive(Debug, Clone, Serialize)]
pub struct RunConfig {
    pub models: Vec<LearnerKind>,
    pub tune: TuneConfig,
    pub test_ratio: f64,
    pub abundance: AbundanceConfig,
    pub importance_repeats: usize,
    pub top_features: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            models: LearnerKind::ALL.to_vec(),
            tune: TuneConfig::default(),
            test_ratio: 0.25,
            abundance: AbundanceConfig::default(),
            importance_repeats: 5,
            top_features: 20,
        }
    }
}

impl RunConfig {
    /// Selected learners in report order, without duplicates
    pub fn ordered_models(&self) -> Vec<LearnerKind> {
        let mut models = self.models.clone();
        models.sort();
        models.dedup();
        models
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ModelTimings {
    pub tuning_secs: f64,
    pub fit_secs: f64,
    pub importance_secs: f64,
    pub total_secs: f64,
}

/// Outcome of one learner
#[derive(Debug, Clone, Serialize)]
pub struct ModelResult {
    pub learner: LearnerKind,
    pub is_baseline: bool,
    /// Set when any step failed; the remaining fields may then be empty
    pub error: Option<String>,
    pub best_params: Option<ParamSet>,
    pub cv_mean: Option<f64>,
    pub cv_sd: Option<f64>,
    pub n_trials: usize,
    pub n_failed_trials: usize,
    pub trials: Vec<Trial>,
    pub test_metrics: Option<BinaryMetrics>,
    pub importance: Vec<FeatureImportance>,
    /// Class-1 probabilities on the holdout, in holdout order
    #[serde(skip)]
    pub test_probabilities: Vec<f64>,
    #[serde(skip)]
    pub roc: Vec<(f64, f64)>,
    pub timings: ModelTimings,
}

impl ModelResult {
    fn failed(learner: LearnerKind, error: String) -> Self {
        Self {
            learner,
            is_baseline: learner.is_baseline(),
            error: Some(error),
            best_params: None,
            cv_mean: None,
            cv_sd: None,
            n_trials: 0,
            n_failed_trials: 0,
            trials: Vec::new(),
            test_metrics: None,
            importance: Vec::new(),
            test_probabilities: Vec::new(),
            roc: Vec::new(),
            timings: ModelTimings::default(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.test_metrics.is_some()
    }
}

/// Everything the report needs
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkResult {
    pub models: Vec<ModelResult>,
    pub aggregate_importance: Vec<AggregateImportance>,
    pub best_model: Option<LearnerKind>,
    #[serde(skip)]
    pub test_sample_ids: Vec<String>,
    #[serde(skip)]
    pub test_truth: Vec<f64>,
}

impl BenchmarkResult {
    pub fn successful(&self) -> impl Iterator<Item = &ModelResult> {
        self.models.iter().filter(|m| m.succeeded())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ModelResult> {
        self.models.iter().filter(|m| !m.succeeded())
    }

    pub fn get(&self, learner: LearnerKind) -> Option<&ModelResult> {
        self.models.iter().find(|m| m.learner == learner)
    }
}

/// Tune on `train`, refit the winner on all of `train`, then score `test`
pub fn evaluate_learner(
    kind: LearnerKind,
    train: &ClassificationTask,
    test: &ClassificationTask,
    config: &RunConfig,
    show_progress: bool,
) -> ModelResult {
    let start = Instant::now();
    let outcome = try_evaluate(kind, train, test, config, show_progress);
    match outcome {
        Ok(mut result) => {
            result.timings.total_secs = start.elapsed().as_secs_f64();
            result
        }
        Err(e) => {
            tracing::warn!(learner = %kind, error = %format!("{:#}", e), "model failed");
            let mut result = ModelResult::failed(kind, format!("{:#}", e));
            result.timings.total_secs = start.elapsed().as_secs_f64();
            result
        }
    }
}

fn try_evaluate(
    kind: LearnerKind,
    train: &ClassificationTask,
    test: &ClassificationTask,
    config: &RunConfig,
    show_progress: bool,
) -> Result<ModelResult> {
    let n_trials = if kind.search_space().is_empty() { 1 } else { config.tune.n_evals.max(1) };
    let pb = show_progress.then(|| create_progress_bar(n_trials as u64, &format!("      {:<12}", kind.name())));

    let tuning = tune_with_progress(kind, train, &config.tune, pb.as_ref())
        .with_context(|| format!("Tuning {} failed", kind))?;
    let best = match tuning.best_trial() {
        Some(best) => best.clone(),
        None => {
            if let Some(pb) = &pb {
                finish_with_warning(pb, &format!("{}: every trial failed", kind));
            }
            let reason = tuning
                .trials
                .iter()
                .find_map(|t| t.error.clone())
                .unwrap_or_else(|| "no usable score".to_string());
            anyhow::bail!("All {} trials failed (first error: {})", tuning.trials.len(), reason);
        }
    };
    if let Some(pb) = &pb {
        finish_with_success(
            pb,
            &format!(
                "{:<12} CV {} = {:.4} ± {:.4}",
                kind.name(),
                config.tune.measure,
                best.mean,
                best.sd
            ),
        );
    }

    let fit_start = Instant::now();
    let mut learner = kind.build(&best.params, config.tune.seed)?;
    learner
        .fit(&train.x, &train.y)
        .with_context(|| format!("Refitting {} on the training set failed", kind))?;
    let proba = learner.predict_proba(&test.x)?;
    check_probabilities(&proba).with_context(|| format!("{} holdout predictions are unusable", kind))?;
    let truth = test.y.to_vec();
    let probabilities = proba.to_vec();
    let test_metrics = BinaryMetrics::compute(&truth, &probabilities);
    let fit_secs = fit_start.elapsed().as_secs_f64();

    let importance_start = Instant::now();
    let importance = permutation_importance(
        learner.as_ref(),
        &test.x,
        &test.y,
        &test.feature_names,
        config.importance_repeats,
        config.tune.seed,
    )?;
    let importance_secs = importance_start.elapsed().as_secs_f64();

    Ok(ModelResult {
        learner: kind,
        is_baseline: kind.is_baseline(),
        error: None,
        best_params: Some(best.params.clone()),
        cv_mean: Some(best.mean),
        cv_sd: Some(best.sd),
        n_trials: tuning.trials.len(),
        n_failed_trials: tuning.n_failed(),
        roc: roc_curve(&truth, &probabilities),
        test_probabilities: probabilities,
        trials: tuning.trials,
        test_metrics: Some(test_metrics),
        importance,
        timings: ModelTimings {
            tuning_secs: tuning.elapsed_secs,
            fit_secs,
            importance_secs,
            total_secs: 0.0,
        },
    })
}

/// Best successful non-baseline model on the holdout; ties go to report order
pub fn select_best_model(models: &[ModelResult], config: &RunConfig) -> Option<LearnerKind> {
    let measure = config.tune.measure;
    let mut best: Option<(LearnerKind, f64)> = None;
    for model in models.iter().filter(|m| m.succeeded() && !m.is_baseline) {
        let Some(metrics) = &model.test_metrics else { continue };
        let value = metrics.get(measure);
        if !value.is_finite() {
            continue;
        }
        match best {
            Some((_, b)) if !measure.is_better(value, b) => {}
            _ => best = Some((model.learner, value)),
        }
    }
    best.map(|(kind, _)| kind)
}

/// Run every selected learner and aggregate their importances
pub fn run_benchmark(
    train: &ClassificationTask,
    test: &ClassificationTask,
    config: &RunConfig,
    show_progress: bool,
) -> Result<BenchmarkResult> {
    if train.feature_names != test.feature_names {
        anyhow::bail!("Train and test tasks have different features");
    }
    train.check_folds(config.tune.folds)?;

    let models: Vec<ModelResult> = config
        .ordered_models()
        .into_iter()
        .map(|kind| evaluate_learner(kind, train, test, config, show_progress))
        .collect();

    let explained: Vec<&[FeatureImportance]> = models
        .iter()
        .filter(|m| m.succeeded() && !m.is_baseline)
        .map(|m| m.importance.as_slice())
        .collect();
    let aggregate = aggregate_importance(&explained, config.top_features);
    let best_model = select_best_model(&models, config);

    Ok(BenchmarkResult {
        models,
        aggregate_importance: aggregate,
        best_model,
        test_sample_ids: test.sample_ids.clone(),
        test_truth: test.y.to_vec(),
    })
}
