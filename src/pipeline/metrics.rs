//! Binary classification metrics on class-1 probabilities

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::learners::DECISION_THRESHOLD;

/// Probabilities are clipped to `[EPS, 1 - EPS]` for log loss
const LOGLOSS_EPS: f64 = 1e-15;

/// Scores closer than this are ranked as ties
const TIE_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(truth: &[f64], prob: &[f64]) -> Self {
        let mut cm = ConfusionMatrix::default();
        for (&t, &p) in truth.iter().zip(prob.iter()) {
            match (t >= 0.5, p >= DECISION_THRESHOLD) {
                (true, true) => cm.tp += 1,
                (false, true) => cm.fp += 1,
                (false, false) => cm.tn += 1,
                (true, false) => cm.fn_ += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Area under the ROC curve as the Mann-Whitney rank statistic.
///
/// Tied scores share their average rank. Returns 0.5 when either class is
/// absent and NaN when any score is not finite.
pub fn auc(truth: &[f64], prob: &[f64]) -> f64 {
    if prob.iter().any(|p| !p.is_finite()) {
        return f64::NAN;
    }
    let mut pairs: Vec<(f64, bool)> = prob
        .iter()
        .zip(truth.iter())
        .map(|(&p, &t)| (p, t >= 0.5))
        .collect();
    let n_pos = pairs.iter().filter(|(_, pos)| *pos).count() as f64;
    let n_neg = pairs.len() as f64 - n_pos;
    if n_pos == 0.0 || n_neg == 0.0 {
        return 0.5;
    }

    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n = pairs.len();
    let mut rank_sum_pos = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && (pairs[j].0 - pairs[i].0).abs() < TIE_TOLERANCE {
            j += 1;
        }
        // Ranks i+1..=j averaged over the tie group
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        let pos_in_group = pairs[i..j].iter().filter(|(_, pos)| *pos).count() as f64;
        rank_sum_pos += avg_rank * pos_in_group;
        i = j;
    }

    let u = rank_sum_pos - n_pos * (n_pos + 1.0) / 2.0;
    u / (n_pos * n_neg)
}

/// ROC curve points `(fpr, tpr)` from (0, 0) to (1, 1), one per distinct score
pub fn roc_curve(truth: &[f64], prob: &[f64]) -> Vec<(f64, f64)> {
    let mut pairs: Vec<(f64, bool)> = prob
        .iter()
        .zip(truth.iter())
        .map(|(&p, &t)| (p, t >= 0.5))
        .collect();
    let n_pos = pairs.iter().filter(|(_, pos)| *pos).count();
    let n_neg = pairs.len() - n_pos;

    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut points = vec![(0.0, 0.0)];
    let (mut tp, mut fp) = (0usize, 0usize);
    let mut i = 0;
    while i < pairs.len() {
        let score = pairs[i].0;
        loop {
            if pairs[i].1 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
            let tied = i < pairs.len() && (pairs[i].0 - score).abs() < TIE_TOLERANCE;
            if !tied {
                break;
            }
        }
        points.push((ratio(fp, n_neg), ratio(tp, n_pos)));
    }
    if points.last() != Some(&(1.0, 1.0)) {
        points.push((1.0, 1.0));
    }
    points
}

/// Every reported metric for one set of predictions
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BinaryMetrics {
    pub auc: f64,
    pub accuracy: f64,
    pub balanced_accuracy: f64,
    pub sensitivity: f64,
    pub specificity: f64,
    pub precision: f64,
    pub f1: f64,
    pub brier: f64,
    pub logloss: f64,
    pub ce: f64,
    pub confusion: ConfusionMatrix,
}

impl BinaryMetrics {
    pub fn compute(truth: &[f64], prob: &[f64]) -> Self {
        let cm = ConfusionMatrix::from_predictions(truth, prob);
        let n = cm.total().max(1) as f64;

        let sensitivity = ratio(cm.tp, cm.tp + cm.fn_);
        let specificity = ratio(cm.tn, cm.tn + cm.fp);
        let precision = ratio(cm.tp, cm.tp + cm.fp);
        let f1 = if precision + sensitivity > 0.0 {
            2.0 * precision * sensitivity / (precision + sensitivity)
        } else {
            0.0
        };
        let accuracy = (cm.tp + cm.tn) as f64 / n;

        let brier = truth
            .iter()
            .zip(prob.iter())
            .map(|(t, p)| (p - t).powi(2))
            .sum::<f64>()
            / n;
        let logloss = -truth
            .iter()
            .zip(prob.iter())
            .map(|(&t, &p)| {
                let p = p.clamp(LOGLOSS_EPS, 1.0 - LOGLOSS_EPS);
                t * p.ln() + (1.0 - t) * (1.0 - p).ln()
            })
            .sum::<f64>()
            / n;

        Self {
            auc: auc(truth, prob),
            accuracy,
            balanced_accuracy: (sensitivity + specificity) / 2.0,
            sensitivity,
            specificity,
            precision,
            f1,
            brier,
            logloss,
            ce: 1.0 - accuracy,
            confusion: cm,
        }
    }

    pub fn get(&self, measure: Measure) -> f64 {
        match measure {
            Measure::Auc => self.auc,
            Measure::Accuracy => self.accuracy,
            Measure::BalancedAccuracy => self.balanced_accuracy,
            Measure::Sensitivity => self.sensitivity,
            Measure::Specificity => self.specificity,
            Measure::Precision => self.precision,
            Measure::F1 => self.f1,
            Measure::Brier => self.brier,
            Measure::Logloss => self.logloss,
            Measure::Ce => self.ce,
        }
    }
}

/// Performance measure used to rank hyperparameter trials and models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    #[default]
    Auc,
    Accuracy,
    BalancedAccuracy,
    Sensitivity,
    Specificity,
    Precision,
    F1,
    Brier,
    Logloss,
    Ce,
}

impl Measure {
    pub const ALL: [Measure; 10] = [
        Measure::Auc,
        Measure::Accuracy,
        Measure::BalancedAccuracy,
        Measure::Sensitivity,
        Measure::Specificity,
        Measure::Precision,
        Measure::F1,
        Measure::Brier,
        Measure::Logloss,
        Measure::Ce,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Measure::Auc => "auc",
            Measure::Accuracy => "accuracy",
            Measure::BalancedAccuracy => "balanced_accuracy",
            Measure::Sensitivity => "sensitivity",
            Measure::Specificity => "specificity",
            Measure::Precision => "precision",
            Measure::F1 => "f1",
            Measure::Brier => "brier",
            Measure::Logloss => "logloss",
            Measure::Ce => "ce",
        }
    }

    /// Lower is better for loss-type measures
    pub fn minimize(&self) -> bool {
        matches!(self, Measure::Brier | Measure::Logloss | Measure::Ce)
    }

    pub fn score(&self, truth: &[f64], prob: &[f64]) -> f64 {
        match self {
            Measure::Auc => auc(truth, prob),
            _ => BinaryMetrics::compute(truth, prob).get(*self),
        }
    }

    /// True when `a` is strictly better than `b`
    pub fn is_better(&self, a: f64, b: f64) -> bool {
        if self.minimize() {
            a < b
        } else {
            a > b
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Measure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace('-', "_");
        let key = match key.as_str() {
            "roc_auc" => "auc",
            "bacc" => "balanced_accuracy",
            "tpr" | "recall" => "sensitivity",
            "tnr" => "specificity",
            "error" => "ce",
            other => other,
        };
        Measure::ALL
            .iter()
            .find(|m| m.name() == key)
            .copied()
            .ok_or_else(|| {
                format!(
                    "Unknown measure: '{}'. Use one of: {}",
                    s,
                    Measure::ALL.iter().map(|m| m.name()).collect::<Vec<_>>().join(", ")
                )
            })
    }
}
