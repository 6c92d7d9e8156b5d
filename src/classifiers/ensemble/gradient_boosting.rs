use rand::SeedableRng;
use rand::rngs::StdRng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::classifiers::classifier::{Classifier, FitError, Learner, check_training_set};
use crate::classifiers::trees::sampling::{feature_subset, row_subsample};
use crate::classifiers::trees::{BoostedTreeBuilder, BoostedTreeLimits, TreeNode};
use crate::utils::math::{logit, sigmoid};

fn default_n_estimators() -> usize {
    300
}
fn default_learning_rate() -> f64 {
    0.05
}
fn default_max_depth() -> usize {
    4
}
fn default_min_samples_split() -> usize {
    2
}
fn default_min_samples_leaf() -> usize {
    1
}
fn default_min_child_weight() -> f64 {
    8.0
}
fn default_subsample() -> f64 {
    0.75
}
fn default_colsample() -> f64 {
    0.75
}
fn default_gamma() -> f64 {
    2.5
}
fn default_reg_alpha() -> f64 {
    0.5
}
fn default_reg_lambda() -> f64 {
    1.8
}
fn default_seed() -> u64 {
    42
}

/// Binary log-loss boosting over second-order regression trees.
///
/// The field defaults are the regularized configuration. [`GradientBoostingParams::classic`]
/// turns the regularization off and limits node sizes instead.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct GradientBoostingParams {
    #[serde(default = "default_n_estimators")]
    #[schemars(
        title = "Boosting rounds",
        description = "Number of trees added to the ensemble.",
        range(min = 1),
        default = "default_n_estimators"
    )]
    pub n_estimators: usize,

    #[serde(default = "default_learning_rate")]
    #[schemars(
        title = "Learning rate",
        description = "Shrinkage applied to every tree's output.",
        range(min = 0.0, max = 1.0),
        default = "default_learning_rate"
    )]
    pub learning_rate: f64,

    #[serde(default = "default_max_depth")]
    #[schemars(
        title = "Max depth",
        description = "Deepest split level of each tree.",
        range(min = 1),
        default = "default_max_depth"
    )]
    pub max_depth: usize,

    #[serde(default = "default_min_samples_split")]
    #[schemars(
        title = "Min samples to split",
        description = "A node with fewer rows becomes a leaf.",
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

    #[serde(default = "default_min_child_weight")]
    #[schemars(
        title = "Min child weight",
        description = "Minimum hessian sum on each side of a split.",
        range(min = 0.0),
        default = "default_min_child_weight"
    )]
    pub min_child_weight: f64,

    #[serde(default = "default_subsample")]
    #[schemars(
        title = "Row subsample",
        description = "Fraction of rows drawn without replacement for each tree.",
        range(min = 0.0, max = 1.0),
        default = "default_subsample"
    )]
    pub subsample: f64,

    #[serde(default = "default_colsample")]
    #[schemars(
        title = "Column subsample",
        description = "Fraction of features available to each tree.",
        range(min = 0.0, max = 1.0),
        default = "default_colsample"
    )]
    pub colsample_bytree: f64,

    #[serde(default = "default_gamma")]
    #[schemars(
        title = "Gamma",
        description = "Minimum loss reduction required to split.",
        range(min = 0.0),
        default = "default_gamma"
    )]
    pub gamma: f64,

    #[serde(default = "default_reg_alpha")]
    #[schemars(
        title = "L1 regularization",
        description = "Soft threshold on leaf gradient sums.",
        range(min = 0.0),
        default = "default_reg_alpha"
    )]
    pub reg_alpha: f64,

    #[serde(default = "default_reg_lambda")]
    #[schemars(
        title = "L2 regularization",
        description = "Added to leaf hessian sums.",
        range(min = 0.0),
        default = "default_reg_lambda"
    )]
    pub reg_lambda: f64,

    #[serde(default = "default_seed")]
    #[schemars(title = "Seed", description = "PRNG seed", default = "default_seed")]
    pub random_state: u64,
}

impl Default for GradientBoostingParams {
    fn default() -> Self {
        Self::regularized()
    }
}

impl GradientBoostingParams {
    /// Regularized boosting: L1/L2 on leaves, minimum split gain, column sampling.
    pub fn regularized() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            learning_rate: default_learning_rate(),
            max_depth: default_max_depth(),
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            min_child_weight: default_min_child_weight(),
            subsample: default_subsample(),
            colsample_bytree: default_colsample(),
            gamma: default_gamma(),
            reg_alpha: default_reg_alpha(),
            reg_lambda: default_reg_lambda(),
            random_state: default_seed(),
        }
    }

    /// Unregularized boosting constrained by node sizes, every feature visible.
    pub fn classic() -> Self {
        Self {
            n_estimators: 250,
            learning_rate: 0.05,
            max_depth: 4,
            min_samples_split: 18,
            min_samples_leaf: 9,
            min_child_weight: 0.0,
            subsample: 0.75,
            colsample_bytree: 1.0,
            gamma: 0.0,
            reg_alpha: 0.0,
            reg_lambda: 0.0,
            random_state: default_seed(),
        }
    }

    pub fn validate(&self) -> Result<(), FitError> {
        let invalid = |msg: &str| Err(FitError::InvalidParameter(msg.to_string()));
        if self.n_estimators == 0 {
            return invalid("n_estimators must be positive");
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return invalid("learning_rate must be in (0, 1]");
        }
        if self.max_depth == 0 {
            return invalid("max_depth must be positive");
        }
        if self.min_samples_split < 2 || self.min_samples_leaf < 1 {
            return invalid("min_samples_split must be >= 2 and min_samples_leaf >= 1");
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return invalid("subsample must be in (0, 1]");
        }
        if !(self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0) {
            return invalid("colsample_bytree must be in (0, 1]");
        }
        if self.min_child_weight < 0.0
            || self.gamma < 0.0
            || self.reg_alpha < 0.0
            || self.reg_lambda < 0.0
        {
            return invalid("regularization terms must be non-negative");
        }
        Ok(())
    }

    fn limits(&self) -> BoostedTreeLimits {
        BoostedTreeLimits {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            min_child_weight: self.min_child_weight,
            reg_lambda: self.reg_lambda,
            reg_alpha: self.reg_alpha,
            gamma: self.gamma,
        }
    }
}

impl Learner for GradientBoostingParams {
    type Model = GradientBoosting;

    fn fit(&self, x: &[Vec<f64>], y: &[usize]) -> Result<GradientBoosting, FitError> {
        self.validate()?;
        let n_features = check_training_set(x, y)?;
        if let Some(&bad) = y.iter().find(|&&c| c > 1) {
            return Err(FitError::UnsupportedClass(bad));
        }

        let n = y.len();
        let positives = y.iter().filter(|&&c| c == 1).count();
        let base_score = logit(positives as f64 / n as f64);
        let targets: Vec<f64> = y.iter().map(|&c| c as f64).collect();
        let cols = ((self.colsample_bytree * n_features as f64).round() as usize).max(1);
        let limits = self.limits();

        let mut rng = StdRng::seed_from_u64(self.random_state);
        let mut margin = vec![base_score; n];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        let mut trees = Vec::with_capacity(self.n_estimators);

        for _ in 0..self.n_estimators {
            for i in 0..n {
                let p = sigmoid(margin[i]);
                grad[i] = p - targets[i];
                hess[i] = p * (1.0 - p);
            }
            let rows = row_subsample(&mut rng, n, self.subsample);
            let features = feature_subset(&mut rng, n_features, cols);
            let tree = BoostedTreeBuilder::new(x, &grad, &hess, &features, limits, self.learning_rate)
                .grow(rows);
            for (m, row) in margin.iter_mut().zip(x) {
                *m += tree.leaf_for(row);
            }
            trees.push(tree);
        }

        Ok(GradientBoosting { base_score, trees })
    }
}

/// Additive log-odds model: `sigmoid(base_score + sum of tree outputs)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    base_score: f64,
    trees: Vec<TreeNode<f64>>,
}

impl GradientBoosting {
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn decision_function(&self, row: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.leaf_for(row)).sum::<f64>()
    }
}

impl Classifier for GradientBoosting {
    fn num_classes(&self) -> usize {
        2
    }

    fn predict(&self, row: &[f64]) -> usize {
        usize::from(self.decision_function(row) > 0.0)
    }

    fn predict_proba(&self, row: &[f64]) -> Option<Vec<f64>> {
        let p = sigmoid(self.decision_function(row));
        Some(vec![1.0 - p, p])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifiers::classifier::accuracy;

    fn separable() -> (Vec<Vec<f64>>, Vec<usize>) {
        let x: Vec<Vec<f64>> = (0..80)
            .map(|i| vec![(i % 10) as f64, i as f64])
            .collect();
        let y = (0..80).map(|i| usize::from(i >= 50)).collect();
        (x, y)
    }

    fn quick(mut p: GradientBoostingParams) -> GradientBoostingParams {
        p.n_estimators = 40;
        p.learning_rate = 0.3;
        p.colsample_bytree = 1.0;
        p.subsample = 1.0;
        p.min_child_weight = p.min_child_weight.min(0.5);
        p.gamma = p.gamma.min(0.1);
        p
    }

    #[test]
    fn regularized_defaults_match_production_hyperparameters() {
        let p = GradientBoostingParams::default();
        assert_eq!(p.n_estimators, 300);
        assert_eq!(p.max_depth, 4);
        assert_eq!(p.learning_rate, 0.05);
        assert_eq!(p.subsample, 0.75);
        assert_eq!(p.colsample_bytree, 0.75);
        assert_eq!(p.gamma, 2.5);
        assert_eq!(p.min_child_weight, 8.0);
        assert_eq!(p.reg_alpha, 0.5);
        assert_eq!(p.reg_lambda, 1.8);
    }

    #[test]
    fn classic_profile_has_no_regularization() {
        let p = GradientBoostingParams::classic();
        assert_eq!(p.n_estimators, 250);
        assert_eq!(p.min_samples_split, 18);
        assert_eq!(p.min_samples_leaf, 9);
        assert_eq!((p.gamma, p.reg_alpha, p.reg_lambda), (0.0, 0.0, 0.0));
    }

    #[test]
    fn base_score_is_prior_log_odds() {
        let (x, y) = separable();
        let model = GradientBoostingParams {
            n_estimators: 1,
            gamma: 1e9,
            ..quick(GradientBoostingParams::regularized())
        }
        .fit(&x, &y)
        .unwrap();
        let p = model.predict_proba(&x[0]).unwrap();
        assert!((p[1] - 30.0 / 80.0).abs() < 1e-6);
    }

    #[test]
    fn both_profiles_learn_threshold_concept() {
        let (x, y) = separable();
        for params in [
            quick(GradientBoostingParams::regularized()),
            quick(GradientBoostingParams::classic()),
        ] {
            let model = params.fit(&x, &y).unwrap();
            assert_eq!(model.n_trees(), 40);
            assert!(accuracy(&model, &x, &y) > 0.95);
        }
    }

    #[test]
    fn rejects_non_binary_labels() {
        let err = GradientBoostingParams::default()
            .fit(&[vec![0.0], vec![1.0]], &[0, 2])
            .unwrap_err();
        assert_eq!(err, FitError::UnsupportedClass(2));
    }

    #[test]
    fn rejects_out_of_range_rates() {
        let p = GradientBoostingParams {
            subsample: 0.0,
            ..Default::default()
        };
        assert!(matches!(p.validate(), Err(FitError::InvalidParameter(_))));
    }
}
