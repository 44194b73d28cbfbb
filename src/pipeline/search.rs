//! Random-search hyperparameter tuning with stratified cross-validation

use std::time::Instant;

use anyhow::Result;
use indicatif::ProgressBar;
use ndarray::Axis;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;

use super::metrics::Measure;
use super::resampling::{stratified_kfold, CvSplit};
use super::task::ClassificationTask;
use crate::learners::{check_probabilities, LearnerError, LearnerKind, ParamSet};

/// Settings shared by every learner's search
#[derive(Debug, Clone, Serialize)]
pub struct TuneConfig {
    /// Random-search trials per learner
    pub n_evals: usize,
    pub folds: usize,
    pub measure: Measure,
    pub seed: u64,
}

impl Default for TuneConfig {
    fn default() -> Self {
        Self {
            n_evals: 20,
            folds: 5,
            measure: Measure::Auc,
            seed: 42,
        }
    }
}

impl TuneConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_n_evals(mut self, n: usize) -> Self {
        self.n_evals = n.max(1);
        self
    }

    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    pub fn with_measure(mut self, measure: Measure) -> Self {
        self.measure = measure;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// One sampled parameter set and its cross-validated score
#[derive(Debug, Clone, Serialize)]
pub struct Trial {
    pub trial_id: usize,
    pub params: ParamSet,
    /// Mean fold score; NaN when the trial failed
    pub mean: f64,
    pub sd: f64,
    pub fold_scores: Vec<f64>,
    pub error: Option<String>,
    pub duration_secs: f64,
}

impl Trial {
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.mean.is_finite()
    }
}

/// All trials of one learner's search
#[derive(Debug, Clone, Serialize)]
pub struct TuningResult {
    pub learner: LearnerKind,
    pub measure: Measure,
    pub trials: Vec<Trial>,
    pub best_trial_idx: Option<usize>,
    pub elapsed_secs: f64,
}

impl TuningResult {
    pub fn best_trial(&self) -> Option<&Trial> {
        self.best_trial_idx.map(|idx| &self.trials[idx])
    }

    pub fn best_params(&self) -> Option<&ParamSet> {
        self.best_trial().map(|t| &t.params)
    }

    pub fn n_failed(&self) -> usize {
        self.trials.iter().filter(|t| !t.succeeded()).count()
    }
}

/// Score one parameter set on every split
pub fn cross_validate(
    kind: LearnerKind,
    params: &ParamSet,
    task: &ClassificationTask,
    splits: &[CvSplit],
    measure: Measure,
    seed: u64,
) -> std::result::Result<Vec<f64>, LearnerError> {
    splits
        .iter()
        .map(|split| {
            let x_train = task.x.select(Axis(0), &split.train_indices);
            let y_train = task.y.select(Axis(0), &split.train_indices);
            let x_test = task.x.select(Axis(0), &split.test_indices);
            let y_test = task.y.select(Axis(0), &split.test_indices);

            let mut learner = kind.build(params, seed)?;
            learner.fit(&x_train, &y_train)?;
            let proba = learner.predict_proba(&x_test)?;
            check_probabilities(&proba)?;
            Ok(measure.score(&y_test.to_vec(), &proba.to_vec()))
        })
        .collect()
}

fn mean_sd(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let sd = if values.len() > 1 {
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    } else {
        0.0
    };
    (mean, sd)
}

/// Index of the best successful trial; ties go to the earliest trial
pub fn select_best(trials: &[Trial], measure: Measure) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (idx, trial) in trials.iter().enumerate() {
        if !trial.succeeded() {
            continue;
        }
        match best {
            Some(b) if !measure.is_better(trial.mean, trials[b].mean) => {}
            _ => best = Some(idx),
        }
    }
    best
}

/// Random search over the learner's space, scored by stratified k-fold CV
pub fn tune(kind: LearnerKind, task: &ClassificationTask, config: &TuneConfig) -> Result<TuningResult> {
    tune_with_progress(kind, task, config, None)
}

/// [`tune`] that ticks a progress bar once per finished trial
pub fn tune_with_progress(
    kind: LearnerKind,
    task: &ClassificationTask,
    config: &TuneConfig,
    progress: Option<&ProgressBar>,
) -> Result<TuningResult> {
    let start = Instant::now();
    let splits = stratified_kfold(&task.y, config.folds, config.seed)?;
    let space = kind.search_space();
    let n_trials = if space.is_empty() { 1 } else { config.n_evals.max(1) };

    let trials: Vec<Trial> = (0..n_trials)
        .into_par_iter()
        .map(|trial_id| {
            let trial_start = Instant::now();
            let trial_seed = config.seed.wrapping_add(trial_id as u64);
            let mut rng = ChaCha8Rng::seed_from_u64(trial_seed);
            let params = space.sample(&mut rng);

            let outcome = cross_validate(kind, &params, task, &splits, config.measure, trial_seed);
            let trial = match outcome {
                Ok(scores) if scores.iter().all(|s| s.is_finite()) => {
                    let (mean, sd) = mean_sd(&scores);
                    tracing::debug!(learner = %kind, trial_id, %params, mean, sd, "trial done");
                    Trial {
                        trial_id,
                        params,
                        mean,
                        sd,
                        fold_scores: scores,
                        error: None,
                        duration_secs: trial_start.elapsed().as_secs_f64(),
                    }
                }
                Ok(scores) => {
                    tracing::warn!(learner = %kind, trial_id, %params, "trial produced a non-finite score");
                    Trial {
                        trial_id,
                        params,
                        mean: f64::NAN,
                        sd: f64::NAN,
                        fold_scores: scores,
                        error: Some("non-finite fold score".to_string()),
                        duration_secs: trial_start.elapsed().as_secs_f64(),
                    }
                }
                Err(e) => {
                    tracing::warn!(learner = %kind, trial_id, %params, error = %e, "trial failed");
                    Trial {
                        trial_id,
                        params,
                        mean: f64::NAN,
                        sd: f64::NAN,
                        fold_scores: Vec::new(),
                        error: Some(e.to_string()),
                        duration_secs: trial_start.elapsed().as_secs_f64(),
                    }
                }
            };
            if let Some(pb) = progress {
                pb.inc(1);
            }
            trial
        })
        .collect();

    let best_trial_idx = select_best(&trials, config.measure);

    Ok(TuningResult {
        learner: kind,
        measure: config.measure,
        trials,
        best_trial_idx,
        elapsed_secs: start.elapsed().as_secs_f64(),
    })
}
