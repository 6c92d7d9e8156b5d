use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::classifiers::Classifier;
use crate::evaluation::cross_validation::CvScores;
use crate::evaluation::{BasicEstimator, ClassificationEvaluator, ConfusionMatrix, PerformanceEvaluator};

const HIGH_GAP: f64 = 0.10;
const MODERATE_GAP: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverfittingStatus {
    Low,
    Moderate,
    High,
}

impl OverfittingStatus {
    pub fn from_gap(gap: f64) -> Self {
        if gap > HIGH_GAP {
            Self::High
        } else if gap > MODERATE_GAP {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub roc_auc: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationSummary {
    pub fold_scores: Vec<f64>,
    pub cv_mean_accuracy: f64,
    pub cv_std: f64,
    pub cv_min: f64,
    pub cv_max: f64,
}

impl From<&CvScores> for CrossValidationSummary {
    fn from(cv: &CvScores) -> Self {
        Self {
            fold_scores: cv.folds.clone(),
            cv_mean_accuracy: cv.mean(),
            cv_std: cv.std_dev(),
            cv_min: cv.min(),
            cv_max: cv.max(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverfittingAnalysis {
    pub training_accuracy: f64,
    pub cv_accuracy: f64,
    pub overfitting_gap: f64,
    pub overfitting_status: OverfittingStatus,
}

/// In-sample metrics plus cross-validated accuracy for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub samples: usize,
    pub class_counts: [usize; 2],
    pub training_metrics: TrainingMetrics,
    pub confusion_matrix: ConfusionMatrix,
    pub cross_validation: CrossValidationSummary,
    pub overfitting_analysis: OverfittingAnalysis,
}

/// Runs `model` over every row and accumulates its binary metrics.
pub fn score_model<C: Classifier + ?Sized>(
    model: &C,
    x: &[Vec<f64>],
    y: &[usize],
) -> ClassificationEvaluator<BasicEstimator> {
    let mut ev = ClassificationEvaluator::new();
    for (row, &label) in x.iter().zip(y) {
        let votes = model.predict_proba(row).unwrap_or_else(|| {
            let mut one_hot = vec![0.0; model.num_classes().max(2)];
            let last = one_hot.len() - 1;
            one_hot[model.predict(row).min(last)] = 1.0;
            one_hot
        });
        ev.add_result(label, &votes);
    }
    ev
}

impl EvaluationReport {
    pub fn new(train: &ClassificationEvaluator<BasicEstimator>, y: &[usize], cv: &CvScores) -> Self {
        let cm = train.confusion();
        let training_accuracy = train.accuracy();
        let cv_accuracy = cv.mean();
        let gap = training_accuracy - cv_accuracy;
        let positives = y.iter().filter(|&&c| c == 1).count();
        Self {
            samples: y.len(),
            class_counts: [y.len() - positives, positives],
            training_metrics: TrainingMetrics {
                accuracy: training_accuracy,
                precision: cm.precision(),
                recall: cm.recall(),
                f1_score: cm.f1(),
                roc_auc: train.roc_auc(),
            },
            confusion_matrix: cm,
            cross_validation: CrossValidationSummary::from(cv),
            overfitting_analysis: OverfittingAnalysis {
                training_accuracy,
                cv_accuracy,
                overfitting_gap: gap,
                overfitting_status: OverfittingStatus::from_gap(gap),
            },
        }
    }
}

impl Display for EvaluationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let t = &self.training_metrics;
        let cm = &self.confusion_matrix;
        let cv = &self.cross_validation;
        let o = &self.overfitting_analysis;
        writeln!(
            f,
            "Samples: {} (Not Potable={}, Potable={})",
            self.samples, self.class_counts[0], self.class_counts[1]
        )?;
        writeln!(f, "Accuracy:  {:.4}", t.accuracy)?;
        writeln!(f, "Precision: {:.4}", t.precision)?;
        writeln!(f, "Recall:    {:.4}", t.recall)?;
        writeln!(f, "F1-Score:  {:.4}", t.f1_score)?;
        writeln!(f, "ROC-AUC:   {:.4}", t.roc_auc)?;
        writeln!(
            f,
            "Confusion: TN={} FP={} FN={} TP={}",
            cm.true_negatives, cm.false_positives, cm.false_negatives, cm.true_positives
        )?;
        let folds: Vec<String> = cv.fold_scores.iter().map(|s| format!("{s:.4}")).collect();
        writeln!(f, "CV folds:  [{}]", folds.join(", "))?;
        writeln!(
            f,
            "CV mean:   {:.4} (+/- {:.4}), min {:.4}, max {:.4}",
            cv.cv_mean_accuracy,
            cv.cv_std * 2.0,
            cv.cv_min,
            cv.cv_max
        )?;
        write!(
            f,
            "Overfitting gap: {:.4} ({:?})",
            o.overfitting_gap, o.overfitting_status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifiers::MajorityClass;

    #[test]
    fn gap_thresholds() {
        assert_eq!(OverfittingStatus::from_gap(0.02), OverfittingStatus::Low);
        assert_eq!(OverfittingStatus::from_gap(0.05), OverfittingStatus::Low);
        assert_eq!(OverfittingStatus::from_gap(0.07), OverfittingStatus::Moderate);
        assert_eq!(OverfittingStatus::from_gap(0.2), OverfittingStatus::High);
    }

    #[test]
    fn hard_label_model_is_scored_from_one_hot_votes() {
        let x = vec![vec![0.0]; 4];
        let y = vec![0, 0, 0, 1];
        let ev = score_model(&MajorityClass::new(0, 2), &x, &y);
        assert!((ev.accuracy() - 0.75).abs() < 1e-12);
        assert_eq!(ev.confusion().false_negatives, 1);
    }

    #[test]
    fn report_combines_training_and_cv() {
        let x = vec![vec![0.0]; 4];
        let y = vec![0, 0, 0, 1];
        let ev = score_model(&MajorityClass::new(0, 2), &x, &y);
        let cv = CvScores {
            folds: vec![0.5, 0.7],
        };
        let report = EvaluationReport::new(&ev, &y, &cv);
        assert_eq!(report.class_counts, [3, 1]);
        assert!((report.cross_validation.cv_mean_accuracy - 0.6).abs() < 1e-12);
        assert!((report.overfitting_analysis.overfitting_gap - 0.15).abs() < 1e-12);
        assert_eq!(
            report.overfitting_analysis.overfitting_status,
            OverfittingStatus::High
        );

        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["overfitting_analysis"]["overfitting_status"], "high");
        assert_eq!(v["confusion_matrix"]["true_negatives"], 3);
        assert!(report.to_string().contains("TN=3"));
    }
}
