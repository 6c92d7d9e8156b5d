use std::sync::Arc;

use tracing::{debug, info};

use crate::classifiers::Classifier;
use crate::core::{Potability, WaterSample};
use crate::serving::{ArtifactCache, Prediction, PredictionError};
use crate::versioning::{ArtifactError, ArtifactPair, RegistryError, VersionName, VersionRegistry};

/// Serves predictions from cached artifacts of the current (or a named) version.
pub struct PredictionAdapter {
    registry: Arc<VersionRegistry>,
    cache: ArtifactCache,
}

impl PredictionAdapter {
    pub fn new(registry: Arc<VersionRegistry>) -> Self {
        Self {
            registry,
            cache: ArtifactCache::new(),
        }
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Cached artifacts for `version`, loading them through the registry on a miss.
    pub fn artifacts(&self, version: &VersionName) -> Result<Arc<ArtifactPair>, PredictionError> {
        if !self.registry.contains(version) {
            return Err(RegistryError::VersionNotFound(version.clone()).into());
        }
        Ok(self
            .cache
            .get_or_load(version, || self.registry.load_artifacts(version))?)
    }

    /// Predicts one sample. Without `version` the registry's current version is used,
    /// resolved on every call.
    pub fn predict(
        &self,
        sample: &WaterSample,
        version: Option<&VersionName>,
    ) -> Result<Prediction, PredictionError> {
        sample.validate()?;
        let version = match version {
            Some(v) => v.clone(),
            None => self.registry.current(),
        };
        let pair = self.artifacts(&version)?;
        let (class, confidence) = infer(&pair, &version, &sample.to_vec())?;
        let potability =
            Potability::from_class(class).ok_or_else(|| ArtifactError::ModelUnavailable {
                version: version.clone(),
                reason: format!("model predicted unknown class {class}"),
            })?;
        debug!(%version, %potability, confidence, "prediction");
        Ok(Prediction {
            potability,
            confidence,
            version,
        })
    }

    /// Predicts each sample independently; the first failure aborts the batch.
    pub fn predict_batch(
        &self,
        samples: &[WaterSample],
        version: Option<&VersionName>,
    ) -> Result<Vec<Prediction>, PredictionError> {
        samples.iter().map(|s| self.predict(s, version)).collect()
    }

    /// Drops every cached pair and loads the current version afresh.
    pub fn reload(&self) -> Result<VersionName, PredictionError> {
        self.cache.clear();
        let current = self.registry.current();
        self.artifacts(&current)?;
        info!(version = %current, "reloaded current model");
        Ok(current)
    }

    pub fn evict(&self, version: &VersionName) {
        self.cache.invalidate(version);
    }
}

fn infer(
    pair: &ArtifactPair,
    version: &VersionName,
    raw: &[f64],
) -> Result<(usize, f64), ArtifactError> {
    let row = match &pair.scaler {
        Some(scaler) => scaler
            .transform_row(raw)
            .map_err(|e| ArtifactError::ModelUnavailable {
                version: version.clone(),
                reason: format!("scaler rejected features: {e}"),
            })?,
        None => raw.to_vec(),
    };
    Ok(pair.model.predict_with_confidence(&row))
}
