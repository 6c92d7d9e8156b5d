use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::classifiers::classifier::{Classifier, FitError, Learner};
use crate::classifiers::ensemble::gradient_boosting::{GradientBoosting, GradientBoostingParams};
use crate::classifiers::ensemble::random_forest::{RandomForest, RandomForestParams};
use crate::utils::math::argmax;

fn default_gradient_boosting() -> GradientBoostingParams {
    GradientBoostingParams::classic()
}

/// Hyperparameters of the three-member soft-voting ensemble.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct EnsembleParams {
    #[serde(default)]
    #[schemars(title = "Random forest", description = "Bagged, class-balanced CART trees.")]
    pub random_forest: RandomForestParams,

    #[serde(default)]
    #[schemars(
        title = "Regularized boosting",
        description = "Second-order boosting with L1/L2 leaf penalties and column sampling."
    )]
    pub regularized_boosting: GradientBoostingParams,

    #[serde(default = "default_gradient_boosting")]
    #[schemars(
        title = "Classic boosting",
        description = "Unregularized boosting limited by node sizes.",
        default = "default_gradient_boosting"
    )]
    pub gradient_boosting: GradientBoostingParams,
}

impl Default for EnsembleParams {
    fn default() -> Self {
        Self {
            random_forest: RandomForestParams::default(),
            regularized_boosting: GradientBoostingParams::regularized(),
            gradient_boosting: GradientBoostingParams::classic(),
        }
    }
}

impl Learner for EnsembleParams {
    type Model = SoftVotingEnsemble;

    fn fit(&self, x: &[Vec<f64>], y: &[usize]) -> Result<SoftVotingEnsemble, FitError> {
        let members = vec![
            Member::RandomForest(self.random_forest.fit(x, y)?),
            Member::GradientBoosting(self.regularized_boosting.fit(x, y)?),
            Member::GradientBoosting(self.gradient_boosting.fit(x, y)?),
        ];
        SoftVotingEnsemble::new(members)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "model", rename_all = "kebab-case")]
pub enum Member {
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
}

impl Member {
    fn as_classifier(&self) -> &dyn Classifier {
        match self {
            Self::RandomForest(m) => m,
            Self::GradientBoosting(m) => m,
        }
    }
}

/// Averages member class probabilities with equal weight and predicts the arg-max.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftVotingEnsemble {
    num_classes: usize,
    members: Vec<Member>,
}

impl SoftVotingEnsemble {
    pub fn new(members: Vec<Member>) -> Result<Self, FitError> {
        if members.is_empty() {
            return Err(FitError::InvalidParameter(
                "a voting ensemble needs at least one member".into(),
            ));
        }
        let num_classes = members
            .iter()
            .map(|m| m.as_classifier().num_classes())
            .max()
            .unwrap_or(2);
        Ok(Self {
            num_classes,
            members,
        })
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }
}

impl Classifier for SoftVotingEnsemble {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn predict(&self, row: &[f64]) -> usize {
        self.predict_proba(row)
            .and_then(|p| argmax(&p))
            .unwrap_or(0)
    }

    fn predict_proba(&self, row: &[f64]) -> Option<Vec<f64>> {
        let mut acc = vec![0.0; self.num_classes];
        let mut voters = 0usize;
        for member in &self.members {
            if let Some(p) = member.as_classifier().predict_proba(row) {
                for (a, v) in acc.iter_mut().zip(p) {
                    *a += v;
                }
                voters += 1;
            }
        }
        if voters == 0 {
            return None;
        }
        acc.iter_mut().for_each(|a| *a /= voters as f64);
        Some(acc)
    }
}
