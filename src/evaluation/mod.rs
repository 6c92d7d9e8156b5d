pub mod cross_validation;
mod estimators;
mod evaluators;
mod measurement;
pub mod report;

pub use cross_validation::{CrossValidationError, CvScores, StratifiedKFold, cross_val_accuracy};
pub use estimators::{BasicEstimator, Estimator};
pub use evaluators::{
    ClassificationEvaluator, ConfusionMatrix, PerformanceEvaluator, PerformanceEvaluatorExt,
};
pub use measurement::Measurement;
pub use report::{EvaluationReport, OverfittingStatus, score_model};
