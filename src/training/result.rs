use serde::Serialize;

use crate::versioning::VersionName;

/// Outcome of a successful training run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrainResult {
    pub success: bool,
    pub version: VersionName,
    pub training_samples: usize,
    pub incremental_samples: usize,
    pub accuracy: f64,
    pub cv_accuracy: f64,
    pub cv_scores: Vec<f64>,
    pub message: String,
}
