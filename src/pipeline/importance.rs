//! Permutation feature importance and its aggregation across models

use std::collections::BTreeMap;

use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;

use super::metrics::auc;
use crate::learners::{Learner, Result};

/// Importance of one feature for one fitted model
#[derive(Debug, Clone, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    /// Mean AUC drop when the feature is permuted
    pub importance_mean: f64,
    pub importance_sd: f64,
    /// 1 = most important within the model
    pub rank: usize,
    /// Model-native importance, when the learner has one
    pub native_importance: Option<f64>,
}

/// Per-feature summary over all evaluated models
#[derive(Debug, Clone, Serialize)]
pub struct AggregateImportance {
    pub feature: String,
    pub mean_importance: f64,
    pub mean_rank: f64,
    /// Number of models ranking the feature within the top N
    pub top_n_count: usize,
    pub n_models: usize,
}

/// Permutation importance of every column of `x` for a fitted learner.
///
/// Each repeat shuffles one column with its own seeded RNG and records the
/// drop in AUC against the unshuffled baseline. Results come back sorted by
/// rank.
pub fn permutation_importance(
    learner: &dyn Learner,
    x: &Array2<f64>,
    y: &Array1<f64>,
    feature_names: &[String],
    repeats: usize,
    seed: u64,
) -> Result<Vec<FeatureImportance>> {
    let truth = y.to_vec();
    let baseline = auc(&truth, &learner.predict_proba(x)?.to_vec());
    let repeats = repeats.max(1);
    let native = learner.feature_importance();

    let scores: Vec<(f64, f64)> = (0..x.ncols())
        .into_par_iter()
        .map(|j| {
            let mut permuted = x.clone();
            let mut column: Vec<f64> = x.column(j).to_vec();
            let mut drops = Vec::with_capacity(repeats);

            for r in 0..repeats {
                let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add((j * repeats + r) as u64));
                column.shuffle(&mut rng);
                permuted.column_mut(j).assign(&Array1::from_vec(column.clone()));
                let proba = learner.predict_proba(&permuted)?;
                drops.push(baseline - auc(&truth, &proba.to_vec()));
            }

            let n = drops.len() as f64;
            let mean = drops.iter().sum::<f64>() / n;
            let sd = if drops.len() > 1 {
                (drops.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
            } else {
                0.0
            };
            Ok((mean, sd))
        })
        .collect::<Result<Vec<_>>>()?;

    let entries = feature_names
        .iter()
        .zip(scores)
        .enumerate()
        .map(|(j, (name, (mean, sd)))| FeatureImportance {
            feature: name.clone(),
            importance_mean: mean,
            importance_sd: sd,
            rank: 0,
            native_importance: native.as_ref().and_then(|n| n.get(j).copied()),
        })
        .collect();

    Ok(rank_features(entries))
}

/// Sort by mean importance (descending, then name) and assign ranks from 1
pub fn rank_features(mut entries: Vec<FeatureImportance>) -> Vec<FeatureImportance> {
    entries.sort_by(|a, b| {
        b.importance_mean
            .partial_cmp(&a.importance_mean)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.feature.cmp(&b.feature))
    });
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    entries
}

/// Combine per-model importances into one table, sorted by mean rank then name
pub fn aggregate_importance(per_model: &[&[FeatureImportance]], top_n: usize) -> Vec<AggregateImportance> {
    let mut acc: BTreeMap<&str, (f64, f64, usize, usize)> = BTreeMap::new();
    for model in per_model {
        for entry in model.iter() {
            let slot = acc.entry(entry.feature.as_str()).or_insert((0.0, 0.0, 0, 0));
            slot.0 += entry.importance_mean;
            slot.1 += entry.rank as f64;
            slot.2 += 1;
            if entry.rank <= top_n {
                slot.3 += 1;
            }
        }
    }

    let mut rows: Vec<AggregateImportance> = acc
        .into_iter()
        .map(|(feature, (imp, rank, n, top))| AggregateImportance {
            feature: feature.to_string(),
            mean_importance: imp / n as f64,
            mean_rank: rank / n as f64,
            top_n_count: top,
            n_models: n,
        })
        .collect();

    rows.sort_by(|a, b| {
        a.mean_rank
            .partial_cmp(&b.mean_rank)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.feature.cmp(&b.feature))
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learners::LogisticRegression;
    use ndarray::Array;

    fn entry(feature: &str, mean: f64) -> FeatureImportance {
        FeatureImportance {
            feature: feature.to_string(),
            importance_mean: mean,
            importance_sd: 0.0,
            rank: 0,
            native_importance: None,
        }
    }

    #[test]
    fn test_rank_ties_broken_by_name() {
        let ranked = rank_features(vec![entry("b", 0.1), entry("a", 0.1), entry("c", 0.3)]);
        let order: Vec<(&str, usize)> = ranked.iter().map(|e| (e.feature.as_str(), e.rank)).collect();
        assert_eq!(order, vec![("c", 1), ("a", 2), ("b", 3)]);
    }

    #[test]
    fn test_aggregate_mean_rank_and_top_n() {
        let m1 = rank_features(vec![entry("x", 0.4), entry("y", 0.2), entry("z", 0.0)]);
        let m2 = rank_features(vec![entry("x", 0.1), entry("y", 0.3), entry("z", 0.05)]);
        let agg = aggregate_importance(&[m1.as_slice(), m2.as_slice()], 1);

        assert_eq!(agg[0].feature, "x");
        assert_eq!(agg[0].mean_rank, 1.5);
        assert_eq!(agg[0].top_n_count, 1);
        assert_eq!(agg[1].feature, "y");
        assert_eq!(agg[1].top_n_count, 1);
        assert_eq!(agg[2].feature, "z");
        assert_eq!(agg[2].mean_rank, 3.0);
        assert!((agg[0].mean_importance - 0.25).abs() < 1e-12);
        assert_eq!(agg[0].n_models, 2);
    }

    #[test]
    fn test_permutation_finds_informative_feature() {
        let n = 60;
        let x = Array::from_shape_fn((n, 2), |(i, j)| {
            if j == 0 {
                i as f64
            } else {
                ((i * 17) % 7) as f64
            }
        });
        let y = Array1::from_shape_fn(n, |i| if i >= n / 2 { 1.0 } else { 0.0 });
        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();

        let names = vec!["signal".to_string(), "noise".to_string()];
        let imp = permutation_importance(&model, &x, &y, &names, 3, 1).unwrap();

        assert_eq!(imp[0].feature, "signal");
        assert_eq!(imp[0].rank, 1);
        assert!(imp[0].importance_mean > 0.2);
        assert!(imp[0].native_importance.is_some());
    }
}
