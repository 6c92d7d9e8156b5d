use rand::SeedableRng;
use rand::rngs::StdRng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::classifiers::classifier::{
    Classifier, FitError, Learner, check_training_set, class_count,
};
use crate::classifiers::trees::sampling::bootstrap_counts;
use crate::classifiers::trees::{DecisionTree, DecisionTreeParams, MaxFeatures};
use crate::utils::math::argmax;

fn default_n_estimators() -> usize {
    250
}
fn default_max_depth() -> Option<usize> {
    Some(6)
}
fn default_min_samples_split() -> usize {
    18
}
fn default_min_samples_leaf() -> usize {
    9
}
fn default_bootstrap() -> bool {
    true
}
fn default_seed() -> u64 {
    42
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    Uniform,
    /// `n_samples / (n_classes * count(class))`, computed on the full training set.
    #[default]
    Balanced,
}

impl ClassWeight {
    pub fn weights(self, y: &[usize], num_classes: usize) -> Vec<f64> {
        match self {
            Self::Uniform => vec![1.0; num_classes],
            Self::Balanced => {
                let mut counts = vec![0usize; num_classes];
                for &c in y {
                    counts[c] += 1;
                }
                let present = counts.iter().filter(|&&c| c > 0).count().max(1);
                counts
                    .iter()
                    .map(|&c| {
                        if c == 0 {
                            0.0
                        } else {
                            y.len() as f64 / (present as f64 * c as f64)
                        }
                    })
                    .collect()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct RandomForestParams {
    #[serde(default = "default_n_estimators")]
    #[schemars(
        title = "Trees",
        description = "Number of trees in the forest.",
        range(min = 1),
        default = "default_n_estimators"
    )]
    pub n_estimators: usize,

    #[serde(default = "default_max_depth")]
    #[schemars(
        title = "Max depth",
        description = "Deepest split level of each tree.",
        default = "default_max_depth"
    )]
    pub max_depth: Option<usize>,

    #[serde(default = "default_min_samples_split")]
    #[schemars(
        title = "Min samples to split",
        description = "A node with fewer training rows becomes a leaf.",
        range(min = 2),
        default = "default_min_samples_split"
    )]
    pub min_samples_split: usize,

    #[serde(default = "default_min_samples_leaf")]
    #[schemars(
        title = "Min samples per leaf",
        description = "Each side of a split must keep at least this many rows.",
        range(min = 1),
        default = "default_min_samples_leaf"
    )]
    pub min_samples_leaf: usize,

    #[serde(default)]
    #[schemars(title = "Max features", description = "Features examined at each split.")]
    pub max_features: MaxFeatures,

    #[serde(default)]
    #[schemars(
        title = "Class weight",
        description = "Reweights classes inversely to their frequency when balanced."
    )]
    pub class_weight: ClassWeight,

    #[serde(default = "default_bootstrap")]
    #[schemars(
        title = "Bootstrap",
        description = "Grow each tree on a bootstrap resample.",
        default = "default_bootstrap"
    )]
    pub bootstrap: bool,

    #[serde(default = "default_seed")]
    #[schemars(title = "Seed", description = "PRNG seed", default = "default_seed")]
    pub random_state: u64,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            max_depth: default_max_depth(),
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            max_features: MaxFeatures::Sqrt,
            class_weight: ClassWeight::Balanced,
            bootstrap: default_bootstrap(),
            random_state: default_seed(),
        }
    }
}

impl RandomForestParams {
    fn tree_params(&self) -> DecisionTreeParams {
        DecisionTreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features,
            random_state: self.random_state,
        }
    }
}

impl Learner for RandomForestParams {
    type Model = RandomForest;

    fn fit(&self, x: &[Vec<f64>], y: &[usize]) -> Result<RandomForest, FitError> {
        if self.n_estimators == 0 {
            return Err(FitError::InvalidParameter(
                "n_estimators must be positive".into(),
            ));
        }
        check_training_set(x, y)?;
        let num_classes = class_count(y);
        let class_weights = self.class_weight.weights(y, num_classes);
        let tree_params = self.tree_params();
        let mut rng = StdRng::seed_from_u64(self.random_state);

        let mut trees = Vec::with_capacity(self.n_estimators);
        for _ in 0..self.n_estimators {
            let draws = if self.bootstrap {
                bootstrap_counts(&mut rng, y.len())
            } else {
                vec![1.0; y.len()]
            };
            let weights: Vec<f64> = draws
                .iter()
                .zip(y)
                .map(|(d, &c)| d * class_weights[c])
                .collect();
            trees.push(tree_params.grow(x, y, &weights, num_classes, &mut rng)?);
        }
        Ok(RandomForest { num_classes, trees })
    }
}

/// Bagged CART trees; class probabilities are the mean of the trees' leaf distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    num_classes: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn predict(&self, row: &[f64]) -> usize {
        self.predict_proba(row)
            .and_then(|p| argmax(&p))
            .unwrap_or(0)
    }

    fn predict_proba(&self, row: &[f64]) -> Option<Vec<f64>> {
        if self.trees.is_empty() {
            return None;
        }
        let mut acc = vec![0.0; self.num_classes];
        for tree in &self.trees {
            if let Some(p) = tree.predict_proba(row) {
                for (a, v) in acc.iter_mut().zip(p) {
                    *a += v;
                }
            }
        }
        let n = self.trees.len() as f64;
        acc.iter_mut().for_each(|a| *a /= n);
        Some(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifiers::classifier::accuracy;

    fn small() -> RandomForestParams {
        RandomForestParams {
            n_estimators: 15,
            max_depth: Some(4),
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            ..Default::default()
        }
    }

    fn separable() -> (Vec<Vec<f64>>, Vec<usize>) {
        let x: Vec<Vec<f64>> = (0..60)
            .map(|i| vec![i as f64, (i % 7) as f64, (i % 3) as f64])
            .collect();
        let y = (0..60).map(|i| usize::from(i >= 40)).collect();
        (x, y)
    }

    #[test]
    fn defaults_match_production_hyperparameters() {
        let p = RandomForestParams::default();
        assert_eq!(p.n_estimators, 250);
        assert_eq!(p.max_depth, Some(6));
        assert_eq!(p.min_samples_split, 18);
        assert_eq!(p.min_samples_leaf, 9);
        assert_eq!(p.max_features, MaxFeatures::Sqrt);
        assert_eq!(p.class_weight, ClassWeight::Balanced);
        assert_eq!(p.random_state, 42);
    }

    #[test]
    fn balanced_weights_equalize_class_mass() {
        let y = [0, 0, 0, 1];
        let w = ClassWeight::Balanced.weights(&y, 2);
        assert!((w[0] * 3.0 - w[1]).abs() < 1e-12);
        assert!((w[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn learns_threshold_concept() {
        let (x, y) = separable();
        let forest = small().fit(&x, &y).unwrap();
        assert_eq!(forest.n_trees(), 15);
        assert!(accuracy(&forest, &x, &y) > 0.95);
    }

    #[test]
    fn probabilities_sum_to_one() {
        let (x, y) = separable();
        let forest = small().fit(&x, &y).unwrap();
        let p = forest.predict_proba(&x[10]).unwrap();
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn deterministic_for_fixed_seed() {
        let (x, y) = separable();
        assert_eq!(small().fit(&x, &y).unwrap(), small().fit(&x, &y).unwrap());
    }

    #[test]
    fn deserializes_partial_config_with_defaults() {
        let p: RandomForestParams = serde_json::from_str(r#"{"n_estimators": 10}"#).unwrap();
        assert_eq!(p.n_estimators, 10);
        assert_eq!(p.min_samples_leaf, 9);
        assert_eq!(p.max_features, MaxFeatures::Sqrt);
    }
}
