//! Integration tests for stratified CV and random-search tuning

use microdx::learners::{LearnerKind, ParamSet, ParamValue};
use microdx::pipeline::*;

mod common;

#[test]
fn test_kfold_partitions_every_sample_once() {
    let task = common::create_crc_task(30, 3);
    let splits = stratified_kfold(&task.y, 5, 42).unwrap();
    assert_eq!(splits.len(), 5);

    let mut seen = vec![0usize; task.n_samples()];
    for split in &splits {
        for &i in &split.test_indices {
            seen[i] += 1;
        }
        assert_eq!(split.train_indices.len() + split.test_indices.len(), task.n_samples());
        // 15 per class over 5 folds: 3 of each class per fold
        let positives = split.test_indices.iter().filter(|&&i| task.y[i] == 1.0).count();
        assert_eq!(positives, 3);
    }
    assert!(seen.iter().all(|&c| c == 1));
}

#[test]
fn test_kfold_rejects_too_many_folds() {
    let task = common::create_crc_task(8, 3);
    assert!(stratified_kfold(&task.y, 5, 42).is_err());
    assert!(stratified_kfold(&task.y, 1, 42).is_err());
}

#[test]
fn test_tune_records_every_trial() {
    let task = common::create_crc_task(30, 4);
    let config = TuneConfig::new().with_n_evals(4).with_folds(3);

    let result = tune(LearnerKind::Logistic, &task, &config).unwrap();

    assert_eq!(result.trials.len(), 4);
    assert_eq!(result.n_failed(), 0);
    for (i, trial) in result.trials.iter().enumerate() {
        assert_eq!(trial.trial_id, i);
        assert_eq!(trial.fold_scores.len(), 3);
        assert!(trial.params.get("alpha").is_some());
    }

    let best = result.best_trial().unwrap();
    assert!(result.trials.iter().all(|t| t.mean <= best.mean));
    // Separable signal taxa
    assert!(best.mean > 0.9, "best CV AUC was {}", best.mean);
}

#[test]
fn test_tune_is_reproducible() {
    let task = common::create_crc_task(24, 5);
    let config = TuneConfig::new().with_n_evals(3).with_folds(3).with_seed(99);

    let a = tune(LearnerKind::Tree, &task, &config).unwrap();
    let b = tune(LearnerKind::Tree, &task, &config).unwrap();

    assert_eq!(a.best_trial_idx, b.best_trial_idx);
    for (ta, tb) in a.trials.iter().zip(b.trials.iter()) {
        assert_eq!(ta.params, tb.params);
        assert_eq!(ta.fold_scores, tb.fold_scores);
    }
}

#[test]
fn test_featureless_runs_a_single_trial() {
    let task = common::create_crc_task(20, 6);
    let config = TuneConfig::new().with_n_evals(10).with_folds(3);

    let result = tune(LearnerKind::Featureless, &task, &config).unwrap();

    assert_eq!(result.trials.len(), 1);
    assert!(result.best_params().unwrap().is_empty());
    assert!((result.best_trial().unwrap().mean - 0.5).abs() < 1e-12);
}

#[test]
fn test_loss_measure_is_minimized() {
    let task = common::create_crc_task(24, 7);
    let config = TuneConfig::new()
        .with_n_evals(3)
        .with_folds(3)
        .with_measure(Measure::Brier);

    let result = tune(LearnerKind::NaiveBayes, &task, &config).unwrap();
    let best = result.best_trial().unwrap();
    assert!(result
        .trials
        .iter()
        .filter(|t| t.succeeded())
        .all(|t| t.mean >= best.mean));
}

#[test]
fn test_wrong_parameter_type_fails_cross_validation() {
    let task = common::create_crc_task(24, 8);
    let splits = stratified_kfold(&task.y, 3, 1).unwrap();
    let params = ParamSet::new().with("alpha", ParamValue::Choice("strong".to_string()));

    let err = cross_validate(LearnerKind::Logistic, &params, &task, &splits, Measure::Auc, 1).unwrap_err();
    assert!(err.to_string().contains("alpha"), "{}", err);
}

#[test]
fn test_non_finite_probabilities_fail_every_trial() {
    let task = common::with_infinite_taxon(&common::create_crc_task(30, 9));
    let config = TuneConfig::new().with_n_evals(3).with_folds(3);

    let result = tune(LearnerKind::NaiveBayes, &task, &config).unwrap();

    assert_eq!(result.trials.len(), 3);
    assert_eq!(result.n_failed(), 3);
    for trial in &result.trials {
        assert!(trial.mean.is_nan());
        assert!(!trial.succeeded());
        let error = trial.error.as_deref().unwrap();
        assert!(error.contains("not finite"), "{}", error);
    }
    assert!(result.best_trial().is_none());
    assert_eq!(select_best(&result.trials, config.measure), None);

    // The same column leaves tree-based tuning untouched
    let tree = tune(LearnerKind::Tree, &task, &config).unwrap();
    assert_eq!(tree.n_failed(), 0);
    assert!(tree.best_trial().is_some());
}
