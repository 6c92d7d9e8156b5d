use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::Rng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::classifiers::classifier::{
    Classifier, FitError, Learner, check_training_set, class_count,
};
use crate::classifiers::trees::node::TreeNode;
use crate::classifiers::trees::sampling::{MaxFeatures, feature_subset, sort_by_feature};
use crate::classifiers::trees::split_criteria::{GiniSplitCriterion, SplitCriterion};
use crate::utils::math::argmax;

const MIN_MERIT: f64 = 1e-12;

fn default_max_depth() -> Option<usize> {
    None
}
fn default_min_samples_split() -> usize {
    2
}
fn default_min_samples_leaf() -> usize {
    1
}
fn default_seed() -> u64 {
    42
}

/// CART growth limits shared by standalone trees and forests.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct DecisionTreeParams {
    #[serde(default = "default_max_depth")]
    #[schemars(
        title = "Max depth",
        description = "Deepest split level; unlimited when absent.",
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
    #[schemars(
        title = "Max features",
        description = "Features examined at each split."
    )]
    pub max_features: MaxFeatures,

    #[serde(default = "default_seed")]
    #[schemars(title = "Seed", description = "PRNG seed", default = "default_seed")]
    pub random_state: u64,
}

impl Default for DecisionTreeParams {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            max_features: MaxFeatures::All,
            random_state: default_seed(),
        }
    }
}

impl DecisionTreeParams {
    pub fn validate(&self) -> Result<(), FitError> {
        if self.min_samples_split < 2 {
            return Err(FitError::InvalidParameter(
                "min_samples_split must be at least 2".into(),
            ));
        }
        if self.min_samples_leaf < 1 {
            return Err(FitError::InvalidParameter(
                "min_samples_leaf must be at least 1".into(),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(FitError::InvalidParameter("max_depth must be positive".into()));
        }
        Ok(())
    }

    /// Grows a tree on rows with positive `weights`, drawing feature subsets from `rng`.
    ///
    /// Row counts for the split limits ignore the weights; class distributions use them.
    pub fn grow<R: Rng + ?Sized>(
        &self,
        x: &[Vec<f64>],
        y: &[usize],
        weights: &[f64],
        num_classes: usize,
        rng: &mut R,
    ) -> Result<DecisionTree, FitError> {
        self.validate()?;
        let n_features = check_training_set(x, y)?;
        if weights.len() != y.len() {
            return Err(FitError::LengthMismatch {
                rows: weights.len(),
                labels: y.len(),
            });
        }
        if let Some(&bad) = y.iter().find(|&&c| c >= num_classes) {
            return Err(FitError::UnsupportedClass(bad));
        }
        let rows: Vec<usize> = (0..y.len()).filter(|&i| weights[i] > 0.0).collect();
        if rows.is_empty() {
            return Err(FitError::EmptyTrainingSet);
        }

        let mut builder = CartBuilder {
            x,
            y,
            weights,
            num_classes,
            params: self,
            features_per_split: self.max_features.resolve(n_features),
            n_features,
            criterion: GiniSplitCriterion::new(),
        };
        let root = builder.build(rows, 0, rng);
        Ok(DecisionTree { num_classes, root })
    }
}

impl Learner for DecisionTreeParams {
    type Model = DecisionTree;

    fn fit(&self, x: &[Vec<f64>], y: &[usize]) -> Result<DecisionTree, FitError> {
        let mut rng = StdRng::seed_from_u64(self.random_state);
        let weights = vec![1.0; y.len()];
        self.grow(x, y, &weights, class_count(y), &mut rng)
    }
}

/// Classification tree whose leaves hold normalized class distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    num_classes: usize,
    root: TreeNode<Vec<f64>>,
}

impl DecisionTree {
    pub fn root(&self) -> &TreeNode<Vec<f64>> {
        &self.root
    }
}

impl Classifier for DecisionTree {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn predict(&self, row: &[f64]) -> usize {
        argmax(self.root.leaf_for(row)).unwrap_or(0)
    }

    fn predict_proba(&self, row: &[f64]) -> Option<Vec<f64>> {
        Some(self.root.leaf_for(row).clone())
    }
}

struct CandidateSplit {
    feature: usize,
    threshold: f64,
    merit: f64,
}

struct CartBuilder<'a, C: SplitCriterion> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    weights: &'a [f64],
    num_classes: usize,
    params: &'a DecisionTreeParams,
    features_per_split: usize,
    n_features: usize,
    criterion: C,
}

impl<C: SplitCriterion> CartBuilder<'_, C> {
    fn distribution(&self, rows: &[usize]) -> Vec<f64> {
        let mut dist = vec![0.0; self.num_classes];
        for &i in rows {
            dist[self.y[i]] += self.weights[i];
        }
        dist
    }

    fn leaf(&self, dist: &[f64]) -> TreeNode<Vec<f64>> {
        let total: f64 = dist.iter().sum();
        let value = if total > 0.0 {
            dist.iter().map(|w| w / total).collect()
        } else {
            vec![1.0 / self.num_classes as f64; self.num_classes]
        };
        TreeNode::leaf(value)
    }

    fn build<R: Rng + ?Sized>(
        &mut self,
        rows: Vec<usize>,
        depth: usize,
        rng: &mut R,
    ) -> TreeNode<Vec<f64>> {
        let dist = self.distribution(&rows);
        let pure = dist.iter().filter(|&&w| w > 0.0).count() <= 1;
        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        if pure || depth_reached || rows.len() < self.params.min_samples_split {
            return self.leaf(&dist);
        }

        let Some(best) = self.best_split(&rows, &dist, rng) else {
            return self.leaf(&dist);
        };

        let (left, right): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&i| self.x[i][best.feature] <= best.threshold);
        let left = self.build(left, depth + 1, rng);
        let right = self.build(right, depth + 1, rng);
        TreeNode::split(best.feature, best.threshold, left, right)
    }

    fn best_split<R: Rng + ?Sized>(
        &self,
        rows: &[usize],
        parent: &[f64],
        rng: &mut R,
    ) -> Option<CandidateSplit> {
        let min_leaf = self.params.min_samples_leaf;
        let mut best: Option<CandidateSplit> = None;
        let mut sorted = rows.to_vec();

        for feature in feature_subset(rng, self.n_features, self.features_per_split) {
            sort_by_feature(self.x, &mut sorted, feature);
            let mut left = vec![0.0; self.num_classes];
            let mut right = parent.to_vec();

            for pos in 0..sorted.len() - 1 {
                let i = sorted[pos];
                left[self.y[i]] += self.weights[i];
                right[self.y[i]] -= self.weights[i];

                let n_left = pos + 1;
                if n_left < min_leaf || sorted.len() - n_left < min_leaf {
                    continue;
                }
                let here = self.x[i][feature];
                let next = self.x[sorted[pos + 1]][feature];
                if here >= next {
                    continue;
                }

                let merit = self.criterion.merit_of_split(parent, &[&left, &right]);
                if merit > MIN_MERIT && best.as_ref().is_none_or(|b| merit > b.merit) {
                    best = Some(CandidateSplit {
                        feature,
                        threshold: here + (next - here) / 2.0,
                        merit,
                    });
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifiers::classifier::accuracy;

    fn quadrant() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for a in 0..6 {
            for b in 0..6 {
                x.push(vec![a as f64, b as f64]);
                y.push(usize::from(a >= 3 && b >= 3));
            }
        }
        (x, y)
    }

    #[test]
    fn fits_axis_aligned_concept_exactly() {
        let (x, y) = quadrant();
        let tree = DecisionTreeParams::default().fit(&x, &y).unwrap();
        assert_eq!(accuracy(&tree, &x, &y), 1.0);
        assert_eq!(tree.root().depth(), 2);
    }

    #[test]
    fn depth_limit_is_respected() {
        let (x, y) = quadrant();
        let params = DecisionTreeParams {
            max_depth: Some(1),
            ..Default::default()
        };
        let tree = params.fit(&x, &y).unwrap();
        assert!(tree.root().depth() <= 1);
    }

    #[test]
    fn min_samples_leaf_blocks_small_children() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let mut y = vec![0; 10];
        y[9] = 1;
        let params = DecisionTreeParams {
            min_samples_leaf: 2,
            ..Default::default()
        };
        let tree = params.fit(&x, &y).unwrap();
        let p = tree.predict_proba(&[9.0]).unwrap();
        assert!(p[1] < 1.0, "single positive row must not get its own leaf");
    }

    #[test]
    fn leaf_distributions_are_normalized_and_weighted() {
        let x = vec![vec![0.0], vec![0.0], vec![0.0]];
        let y = vec![0, 0, 1];
        let tree = DecisionTreeParams::default()
            .grow(&x, &y, &[1.0, 1.0, 2.0], 2, &mut StdRng::seed_from_u64(0))
            .unwrap();
        let p = tree.predict_proba(&[0.0]).unwrap();
        assert!((p[0] - 0.5).abs() < 1e-12);
        assert!((p[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_weight_rows_are_ignored() {
        let x = vec![vec![0.0], vec![1.0]];
        let y = vec![0, 1];
        let tree = DecisionTreeParams::default()
            .grow(&x, &y, &[1.0, 0.0], 2, &mut StdRng::seed_from_u64(0))
            .unwrap();
        assert_eq!(tree.predict(&[1.0]), 0);
    }

    #[test]
    fn rejects_invalid_limits() {
        let params = DecisionTreeParams {
            min_samples_split: 1,
            ..Default::default()
        };
        assert!(matches!(
            params.fit(&[vec![0.0]], &[0]),
            Err(FitError::InvalidParameter(_))
        ));
    }

    #[test]
    fn same_seed_grows_same_tree() {
        let (x, y) = quadrant();
        let params = DecisionTreeParams {
            max_features: MaxFeatures::Count(1),
            ..Default::default()
        };
        assert_eq!(params.fit(&x, &y).unwrap(), params.fit(&x, &y).unwrap());
    }
}
