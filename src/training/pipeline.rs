use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::classifiers::classifier::{FitError, Learner, accuracy};
use crate::classifiers::EnsembleParams;
use crate::core::{Dataset, DatasetError};
use crate::evaluation::{CrossValidationError, CvScores, StratifiedKFold, cross_val_accuracy};
use crate::preprocessing::{ScalerError, StandardScaler};
use crate::versioning::{ArtifactError, ArtifactPair, RegistryError};

fn default_folds() -> usize {
    5
}
fn default_seed() -> u64 {
    42
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct CrossValidationParams {
    #[serde(default = "default_folds")]
    #[schemars(
        title = "Folds",
        description = "Number of stratified folds.",
        range(min = 2),
        default = "default_folds"
    )]
    pub folds: usize,

    #[serde(default = "default_seed")]
    #[schemars(
        title = "Seed",
        description = "Seed for shuffling rows into folds.",
        default = "default_seed"
    )]
    pub random_state: u64,
}

impl Default for CrossValidationParams {
    fn default() -> Self {
        Self {
            folds: default_folds(),
            random_state: default_seed(),
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum PipelineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("scaler: {0}")]
    Scaler(#[from] ScalerError),

    #[error("fit: {0}")]
    Fit(#[from] FitError),

    #[error("cross-validation: {0}")]
    CrossValidation(#[from] CrossValidationError),
}

/// A freshly fitted scaler and ensemble with their scores on the training set.
pub(crate) struct FittedEnsemble {
    pub pair: ArtifactPair,
    pub accuracy: f64,
    pub cv: CvScores,
}

/// Fits a new scaler on `data`, fits the ensemble on the scaled rows, then scores
/// in-sample accuracy and stratified cross-validated accuracy.
pub(crate) fn fit_and_score(
    params: &EnsembleParams,
    cv: &CrossValidationParams,
    data: &Dataset,
) -> Result<FittedEnsemble, PipelineError> {
    let (scaler, x) = StandardScaler::fit_transform(data.features())?;
    let y = data.labels();

    let model = params.fit(&x, y)?;
    let train_accuracy = accuracy(&model, &x, y);
    debug!(rows = y.len(), train_accuracy, "fitted ensemble");

    let splitter = StratifiedKFold::new(cv.folds, cv.random_state)?;
    let scores = cross_val_accuracy(params, &x, y, &splitter)?;
    debug!(folds = cv.folds, cv_accuracy = scores.mean(), "cross-validated ensemble");

    Ok(FittedEnsemble {
        pair: ArtifactPair::new(model.into(), Some(scaler)),
        accuracy: train_accuracy,
        cv: scores,
    })
}
