mod classification_evaluator;
mod performance_evaluator;

pub use classification_evaluator::{ClassificationEvaluator, ConfusionMatrix};
pub use performance_evaluator::{PerformanceEvaluator, PerformanceEvaluatorExt};
