use serde::{Deserialize, Serialize};

use crate::evaluation::{Estimator, Measurement, PerformanceEvaluator};
use crate::utils::math::argmax;

/// Binary confusion counts with class 1 as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_negatives: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
    pub true_positives: u64,
}

impl ConfusionMatrix {
    pub fn total(&self) -> u64 {
        self.true_negatives + self.false_positives + self.false_negatives + self.true_positives
    }

    /// `tp / (tp + fp)`, or 0 when nothing was predicted positive.
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// `tp / (tp + fn)`, or 0 when no positives were seen.
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r > f64::EPSILON {
            2.0 * p * r / (p + r)
        } else {
            0.0
        }
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Area under the ROC curve from positive-class scores, ties sharing their average rank.
///
/// Returns 0 when only one class is present.
pub fn roc_auc(scores: &[(f64, bool)]) -> f64 {
    let positives = scores.iter().filter(|(_, p)| *p).count();
    let negatives = scores.len() - positives;
    if positives == 0 || negatives == 0 {
        return 0.0;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].0.total_cmp(&scores[b].0));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]].0 == scores[order[start]].0 {
            end += 1;
        }
        // 1-based ranks start+1..=end share their mean
        let rank = (start + 1 + end) as f64 / 2.0;
        let tied_positives = order[start..end].iter().filter(|&&i| scores[i].1).count();
        positive_rank_sum += rank * tied_positives as f64;
        start = end;
    }

    let p = positives as f64;
    (positive_rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64)
}

/// Batch evaluator for binary classification.
///
/// Tracks:
/// - overall accuracy;
/// - true and predicted class marginals for Cohen's kappa;
/// - the confusion matrix, from which precision, recall and F1 of class 1 are derived;
/// - the class 1 score of every row, for ROC-AUC.
pub struct ClassificationEvaluator<E: Estimator + Default> {
    weight_correct: E,
    true_marginals: Vec<E>,
    predicted_marginals: Vec<E>,
    confusion: ConfusionMatrix,
    scores: Vec<(f64, bool)>,
}

impl<E: Estimator + Default> Default for ClassificationEvaluator<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Estimator + Default> ClassificationEvaluator<E> {
    pub fn new() -> Self {
        let make_vec = || (0..2).map(|_| E::default()).collect::<Vec<_>>();
        Self {
            weight_correct: E::default(),
            true_marginals: make_vec(),
            predicted_marginals: make_vec(),
            confusion: ConfusionMatrix::default(),
            scores: Vec::new(),
        }
    }

    pub fn confusion(&self) -> ConfusionMatrix {
        self.confusion
    }

    pub fn accuracy(&self) -> f64 {
        self.weight_correct.estimation()
    }

    pub fn roc_auc(&self) -> f64 {
        roc_auc(&self.scores)
    }

    fn kappa(&self) -> f64 {
        let p_o = self.weight_correct.estimation();
        let p_e: f64 = self
            .true_marginals
            .iter()
            .zip(&self.predicted_marginals)
            .map(|(t, p)| t.estimation() * p.estimation())
            .filter(|v| v.is_finite())
            .sum();
        let denom = 1.0 - p_e;
        if denom.abs() > f64::EPSILON {
            (p_o - p_e) / denom
        } else {
            f64::NAN
        }
    }
}

impl<E: Estimator + Default> PerformanceEvaluator for ClassificationEvaluator<E> {
    fn reset(&mut self) {
        *self = Self::new();
    }

    fn add_result(&mut self, true_class: usize, class_votes: &[f64]) {
        if true_class > 1 {
            return;
        }
        let Some(predicted) = argmax(class_votes) else {
            return;
        };
        let predicted = predicted.min(1);

        self.weight_correct
            .add(if predicted == true_class { 1.0 } else { 0.0 });
        for (c, est) in self.true_marginals.iter_mut().enumerate() {
            est.add(if c == true_class { 1.0 } else { 0.0 });
        }
        for (c, est) in self.predicted_marginals.iter_mut().enumerate() {
            est.add(if c == predicted { 1.0 } else { 0.0 });
        }

        match (true_class, predicted) {
            (0, 0) => self.confusion.true_negatives += 1,
            (0, _) => self.confusion.false_positives += 1,
            (_, 0) => self.confusion.false_negatives += 1,
            _ => self.confusion.true_positives += 1,
        }

        let total: f64 = class_votes.iter().filter(|v| v.is_finite()).sum();
        let positive = class_votes.get(1).copied().unwrap_or(0.0);
        let score = if total > 0.0 { positive / total } else { positive };
        self.scores.push((score, true_class == 1));
    }

    fn performance(&self) -> Vec<Measurement> {
        let mut m = vec![Measurement::new("accuracy", self.accuracy())];
        if self.confusion.total() == 0 {
            m.push(Measurement::new("kappa", 0.0));
            return m;
        }
        m.extend([
            Measurement::new("kappa", self.kappa()),
            Measurement::new("precision", self.confusion.precision()),
            Measurement::new("recall", self.confusion.recall()),
            Measurement::new("f1", self.confusion.f1()),
            Measurement::new("roc_auc", self.roc_auc()),
        ]);
        m
    }
}
