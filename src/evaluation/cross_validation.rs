use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classifiers::classifier::{FitError, Learner, accuracy};
use crate::evaluation::{BasicEstimator, Estimator};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CrossValidationError {
    #[error("cross-validation needs at least 2 folds, got {0}")]
    TooFewFolds(usize),

    #[error("cannot split {samples} samples into {folds} folds")]
    TooFewSamples { folds: usize, samples: usize },

    #[error(transparent)]
    Fit(#[from] FitError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// K-fold splitter that keeps each fold's class proportions close to the whole set's.
///
/// Every class is shuffled with the seed, then dealt round-robin across the folds.
/// The deal continues where the previous class stopped, so fold sizes differ by at most one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StratifiedKFold {
    n_splits: usize,
    random_state: u64,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize, random_state: u64) -> Result<Self, CrossValidationError> {
        if n_splits < 2 {
            return Err(CrossValidationError::TooFewFolds(n_splits));
        }
        Ok(Self {
            n_splits,
            random_state,
        })
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    pub fn split(&self, y: &[usize]) -> Result<Vec<Fold>, CrossValidationError> {
        if y.len() < self.n_splits {
            return Err(CrossValidationError::TooFewSamples {
                folds: self.n_splits,
                samples: y.len(),
            });
        }

        let num_classes = y.iter().copied().max().map_or(0, |m| m + 1);
        let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); num_classes];
        for (i, &c) in y.iter().enumerate() {
            by_class[c].push(i);
        }

        let mut rng = StdRng::seed_from_u64(self.random_state);
        let mut fold_of = vec![0usize; y.len()];
        let mut next = 0usize;
        for members in &mut by_class {
            members.shuffle(&mut rng);
            for &i in members.iter() {
                fold_of[i] = next;
                next = (next + 1) % self.n_splits;
            }
        }

        Ok((0..self.n_splits)
            .map(|k| {
                let (test, train): (Vec<usize>, Vec<usize>) =
                    (0..y.len()).partition(|&i| fold_of[i] == k);
                Fold { train, test }
            })
            .collect())
    }
}

/// Per-fold accuracies of one cross-validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvScores {
    pub folds: Vec<f64>,
}

impl CvScores {
    fn summary(&self) -> BasicEstimator {
        self.folds.iter().copied().collect()
    }

    pub fn mean(&self) -> f64 {
        self.summary().estimation()
    }

    pub fn std_dev(&self) -> f64 {
        self.summary().std_dev()
    }

    pub fn min(&self) -> f64 {
        self.summary().min()
    }

    pub fn max(&self) -> f64 {
        self.summary().max()
    }
}

fn gather<T: Clone>(values: &[T], idx: &[usize]) -> Vec<T> {
    idx.iter().map(|&i| values[i].clone()).collect()
}

/// Refits `learner` on each training split and scores accuracy on the held-out fold.
pub fn cross_val_accuracy<L: Learner>(
    learner: &L,
    x: &[Vec<f64>],
    y: &[usize],
    splitter: &StratifiedKFold,
) -> Result<CvScores, CrossValidationError> {
    let mut folds = Vec::with_capacity(splitter.n_splits());
    for fold in splitter.split(y)? {
        let model = learner.fit(&gather(x, &fold.train), &gather(y, &fold.train))?;
        folds.push(accuracy(
            &model,
            &gather(x, &fold.test),
            &gather(y, &fold.test),
        ));
    }
    Ok(CvScores { folds })
}
