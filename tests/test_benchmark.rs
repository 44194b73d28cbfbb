//! End-to-end tests of the comparison loop on synthetic abundance data

use microdx::learners::LearnerKind;
use microdx::pipeline::*;

mod common;

fn split_crc(n_samples: usize, seed: u64) -> (ClassificationTask, ClassificationTask) {
    let task = common::create_crc_task(n_samples, seed);
    task.stratified_holdout(0.25, seed).unwrap()
}

#[test]
fn test_holdout_is_stratified_and_disjoint() {
    let task = common::create_crc_task(40, 1);
    let (train, test) = task.stratified_holdout(0.25, 42).unwrap();

    assert_eq!(train.n_samples() + test.n_samples(), 40);
    assert_eq!(test.class_counts().positive, 5);
    assert_eq!(test.class_counts().negative, 5);
    for id in &test.sample_ids {
        assert!(!train.sample_ids.contains(id));
    }
}

#[test]
fn test_benchmark_runs_every_selected_model() {
    let (train, test) = split_crc(48, 2);
    let config = common::quick_run_config(&[
        LearnerKind::NaiveBayes,
        LearnerKind::Featureless,
        LearnerKind::Logistic,
        LearnerKind::Tree,
    ]);

    let result = run_benchmark(&train, &test, &config, false).unwrap();

    // Report order, not selection order
    let order: Vec<LearnerKind> = result.models.iter().map(|m| m.learner).collect();
    assert_eq!(
        order,
        vec![
            LearnerKind::Featureless,
            LearnerKind::Logistic,
            LearnerKind::Tree,
            LearnerKind::NaiveBayes
        ]
    );
    assert_eq!(result.failed().count(), 0);

    for model in result.successful() {
        assert_eq!(model.test_probabilities.len(), test.n_samples());
        assert_eq!(model.importance.len(), test.n_features());
        assert!(!model.roc.is_empty());
    }

    let baseline = result.get(LearnerKind::Featureless).unwrap();
    assert!(baseline.is_baseline);
    assert_eq!(baseline.n_trials, 1);
    assert!((baseline.test_metrics.unwrap().auc - 0.5).abs() < 1e-12);

    let best = result.best_model.unwrap();
    assert_ne!(best, LearnerKind::Featureless);
    assert!(result.get(best).unwrap().test_metrics.unwrap().auc > 0.9);
}

#[test]
fn test_signal_taxa_lead_the_aggregate_importance() {
    let (train, test) = split_crc(60, 3);
    let config = common::quick_run_config(&[LearnerKind::Logistic, LearnerKind::Forest]);

    let result = run_benchmark(&train, &test, &config, false).unwrap();
    let aggregate = &result.aggregate_importance;

    assert_eq!(aggregate.len(), test.n_features());
    let top_two: Vec<&str> = aggregate.iter().take(2).map(|a| a.feature.as_str()).collect();
    assert!(
        top_two.contains(&"taxon_up") || top_two.contains(&"taxon_down"),
        "top features were {:?}",
        top_two
    );
    assert!(aggregate.iter().all(|a| a.n_models == 2));
    for pair in aggregate.windows(2) {
        assert!(pair[0].mean_rank <= pair[1].mean_rank);
    }
}

#[test]
fn test_too_many_folds_for_training_set() {
    let (train, test) = split_crc(12, 4);
    let mut config = common::quick_run_config(&[LearnerKind::Logistic]);
    config.tune = config.tune.with_folds(10);

    let err = run_benchmark(&train, &test, &config, false).unwrap_err();
    assert!(err.to_string().contains("folds"));
}

#[test]
fn test_mismatched_features_are_rejected() {
    let (train, mut test) = split_crc(24, 5);
    test.feature_names.reverse();
    let config = common::quick_run_config(&[LearnerKind::Logistic]);
    assert!(run_benchmark(&train, &test, &config, false).is_err());
}

#[test]
fn test_baseline_only_run_has_no_best_model() {
    let (train, test) = split_crc(24, 6);
    let config = common::quick_run_config(&[LearnerKind::Featureless]);

    let result = run_benchmark(&train, &test, &config, false).unwrap();
    assert_eq!(result.successful().count(), 1);
    assert!(result.best_model.is_none());
    assert!(result.aggregate_importance.is_empty());
}

#[test]
fn test_failed_learners_do_not_stop_the_run() {
    let task = common::with_infinite_taxon(&common::create_crc_task(40, 7));
    let (train, test) = task.stratified_holdout(0.25, 7).unwrap();
    let config = common::quick_run_config(&[
        LearnerKind::Featureless,
        LearnerKind::Logistic,
        LearnerKind::Tree,
        LearnerKind::NaiveBayes,
    ]);

    let result = run_benchmark(&train, &test, &config, false).unwrap();

    let failed: Vec<LearnerKind> = result.failed().map(|m| m.learner).collect();
    assert_eq!(failed, vec![LearnerKind::Logistic, LearnerKind::NaiveBayes]);
    for kind in failed {
        let model = result.get(kind).unwrap();
        assert!(!model.succeeded());
        let error = model.error.as_deref().unwrap();
        assert!(error.contains("All 3 trials failed"), "{}", error);
        assert!(model.test_metrics.is_none());
        assert!(model.importance.is_empty());
    }

    let tree = result.get(LearnerKind::Tree).unwrap();
    assert!(tree.succeeded());
    assert_eq!(tree.n_failed_trials, 0);

    // Only the tree is explained and eligible
    assert_eq!(result.best_model, Some(LearnerKind::Tree));
    assert_eq!(result.aggregate_importance.len(), test.n_features());
    assert!(result.aggregate_importance.iter().all(|a| a.n_models == 1));
}
