use serde::{Deserialize, Serialize};

use crate::classifiers::classifier::{Classifier, FitError, Learner, check_training_set, class_count};

/// Hard-label baseline that always answers the most frequent training class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MajorityClass {
    class: usize,
    num_classes: usize,
}

impl MajorityClass {
    pub fn new(class: usize, num_classes: usize) -> Self {
        Self {
            class,
            num_classes: num_classes.max(class + 1),
        }
    }

    pub fn class(&self) -> usize {
        self.class
    }
}

impl Classifier for MajorityClass {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn predict(&self, _row: &[f64]) -> usize {
        self.class
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MajorityClassParams;

impl Learner for MajorityClassParams {
    type Model = MajorityClass;

    fn fit(&self, x: &[Vec<f64>], y: &[usize]) -> Result<MajorityClass, FitError> {
        check_training_set(x, y)?;
        let num_classes = class_count(y);
        let mut counts = vec![0usize; num_classes];
        for &c in y {
            counts[c] += 1;
        }
        let mut class = 0;
        for (c, &n) in counts.iter().enumerate() {
            if n > counts[class] {
                class = c;
            }
        }
        Ok(MajorityClass::new(class, num_classes))
    }
}
