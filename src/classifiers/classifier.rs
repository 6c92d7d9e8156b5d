use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FitError {
    #[error("cannot fit on an empty training set")]
    EmptyTrainingSet,

    #[error("{rows} feature rows but {labels} labels")]
    LengthMismatch { rows: usize, labels: usize },

    #[error("feature rows must all have {expected} columns, found {found}")]
    RaggedRows { expected: usize, found: usize },

    #[error("binary learner received class {0}")]
    UnsupportedClass(usize),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Fitted model that labels dense numeric rows.
///
/// `predict` is always available. Models that can estimate class probabilities
/// override [`predict_proba`]; hard-label models keep the default `None`, and
/// [`predict_with_confidence`] then reports a fixed confidence of `1.0`.
pub trait Classifier {
    fn num_classes(&self) -> usize;

    fn predict(&self, row: &[f64]) -> usize;

    fn predict_proba(&self, _row: &[f64]) -> Option<Vec<f64>> {
        None
    }

    /// Predicted class and the probability the model assigns to it.
    fn predict_with_confidence(&self, row: &[f64]) -> (usize, f64) {
        let class = self.predict(row);
        let confidence = self
            .predict_proba(row)
            .and_then(|p| p.get(class).copied())
            .map_or(1.0, |p| p.clamp(0.0, 1.0));
        (class, confidence)
    }
}

/// Hyperparameter set that can produce a fitted [`Classifier`].
///
/// Fitting is deterministic for a fixed parameter value, so cross-validation
/// can refit the same learner on every fold.
pub trait Learner {
    type Model: Classifier;

    fn fit(&self, x: &[Vec<f64>], y: &[usize]) -> Result<Self::Model, FitError>;
}

/// Shape checks shared by every learner. Returns the number of features.
pub fn check_training_set(x: &[Vec<f64>], y: &[usize]) -> Result<usize, FitError> {
    if x.len() != y.len() {
        return Err(FitError::LengthMismatch {
            rows: x.len(),
            labels: y.len(),
        });
    }
    let first = x.first().ok_or(FitError::EmptyTrainingSet)?;
    let width = first.len();
    if let Some(bad) = x.iter().find(|r| r.len() != width) {
        return Err(FitError::RaggedRows {
            expected: width,
            found: bad.len(),
        });
    }
    Ok(width)
}

/// Number of classes implied by the labels, never fewer than two.
pub fn class_count(y: &[usize]) -> usize {
    y.iter().copied().max().map_or(2, |m| (m + 1).max(2))
}

/// Fraction of rows whose prediction matches the label.
pub fn accuracy<C: Classifier + ?Sized>(model: &C, x: &[Vec<f64>], y: &[usize]) -> f64 {
    if y.is_empty() {
        return f64::NAN;
    }
    let correct = x
        .iter()
        .zip(y)
        .filter(|(row, label)| model.predict(row) == **label)
        .count();
    correct as f64 / y.len() as f64
}
