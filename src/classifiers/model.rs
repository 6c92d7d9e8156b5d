use serde::{Deserialize, Serialize};

use crate::classifiers::classifier::Classifier;
use crate::classifiers::ensemble::{GradientBoosting, RandomForest, SoftVotingEnsemble};
use crate::classifiers::majority_class::MajorityClass;

/// Any model the version store can persist and serve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "model", rename_all = "kebab-case")]
pub enum PotabilityModel {
    SoftVoting(SoftVotingEnsemble),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
    MajorityClass(MajorityClass),
}

impl PotabilityModel {
    fn inner(&self) -> &dyn Classifier {
        match self {
            Self::SoftVoting(m) => m,
            Self::RandomForest(m) => m,
            Self::GradientBoosting(m) => m,
            Self::MajorityClass(m) => m,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::SoftVoting(_) => "soft-voting",
            Self::RandomForest(_) => "random-forest",
            Self::GradientBoosting(_) => "gradient-boosting",
            Self::MajorityClass(_) => "majority-class",
        }
    }
}

impl Classifier for PotabilityModel {
    fn num_classes(&self) -> usize {
        self.inner().num_classes()
    }

    fn predict(&self, row: &[f64]) -> usize {
        self.inner().predict(row)
    }

    fn predict_proba(&self, row: &[f64]) -> Option<Vec<f64>> {
        self.inner().predict_proba(row)
    }
}

impl From<SoftVotingEnsemble> for PotabilityModel {
    fn from(m: SoftVotingEnsemble) -> Self {
        Self::SoftVoting(m)
    }
}

impl From<RandomForest> for PotabilityModel {
    fn from(m: RandomForest) -> Self {
        Self::RandomForest(m)
    }
}

impl From<GradientBoosting> for PotabilityModel {
    fn from(m: GradientBoosting) -> Self {
        Self::GradientBoosting(m)
    }
}

impl From<MajorityClass> for PotabilityModel {
    fn from(m: MajorityClass) -> Self {
        Self::MajorityClass(m)
    }
}
