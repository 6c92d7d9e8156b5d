use serde::Serialize;
use thiserror::Error;

use crate::core::{Potability, SampleError};
use crate::error::ErrorClass;
use crate::versioning::{ArtifactError, RegistryError, VersionName};

/// Label and confidence for one sample, with the version that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub potability: Potability,
    pub confidence: f64,
    pub version: VersionName,
}

impl Prediction {
    pub fn label(&self) -> &'static str {
        self.potability.label()
    }
}

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("invalid features: {0}")]
    InvalidFeatures(#[from] SampleError),
}

impl PredictionError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Registry(e) => e.class(),
            Self::Artifact(e) => e.class(),
            Self::InvalidFeatures(_) => ErrorClass::Invalid,
        }
    }
}
