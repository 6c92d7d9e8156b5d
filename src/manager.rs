use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::core::{Dataset, DatasetError, LabeledSample, WaterSample, read_samples_csv};
use crate::error::ErrorClass;
use crate::evaluation::{
    CrossValidationError, EvaluationReport, PerformanceEvaluator, StratifiedKFold,
    cross_val_accuracy, score_model,
};
use crate::preprocessing::ScalerError;
use crate::serving::{Prediction, PredictionAdapter, PredictionError};
use crate::training::{RetrainResult, RetrainingEngine, TrainingError};
use crate::versioning::{
    ArtifactStore, FsArtifactStore, IncrementalStore, RegistryError, VersionName, VersionRecord,
    VersionRegistry, VersionView,
};

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Prediction(#[from] PredictionError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("scaler: {0}")]
    Scaler(#[from] ScalerError),

    #[error("cross-validation: {0}")]
    CrossValidation(#[from] CrossValidationError),
}

impl ManagerError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Prediction(e) => e.class(),
            Self::Dataset(DatasetError::Io { .. }) => ErrorClass::Internal,
            Self::Dataset(_) => ErrorClass::Invalid,
            Self::Scaler(_) => ErrorClass::Unavailable,
            Self::CrossValidation(_) => ErrorClass::Internal,
        }
    }
}

/// Single entry point for a transport layer: registry, retraining and prediction
/// wired to one settings value.
///
/// The `*_and_reload` operations refresh the prediction cache after the registry
/// changes, so callers never serve a stale model after a switch or retrain.
pub struct VersionManager {
    settings: Settings,
    registry: Arc<VersionRegistry>,
    engine: RetrainingEngine,
    adapter: PredictionAdapter,
}

impl VersionManager {
    pub fn open(settings: Settings) -> Result<Self, RegistryError> {
        let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(&settings.models_dir));
        let registry = Arc::new(VersionRegistry::open(
            settings.metadata_path(),
            store,
            settings.seed.record(),
        )?);
        let engine = RetrainingEngine::new(
            Arc::clone(&registry),
            IncrementalStore::new(settings.incremental_path()),
            &settings.base_dataset,
            settings.ensemble.clone(),
            settings.cross_validation.clone(),
        );
        let adapter = PredictionAdapter::new(Arc::clone(&registry));
        info!(
            models_dir = %settings.models_dir.display(),
            current = %registry.current(),
            "version manager ready"
        );
        Ok(Self {
            settings,
            registry,
            engine,
            adapter,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<VersionRegistry> {
        &self.registry
    }

    pub fn adapter(&self) -> &PredictionAdapter {
        &self.adapter
    }

    pub fn engine(&self) -> &RetrainingEngine {
        &self.engine
    }

    pub fn current(&self) -> VersionName {
        self.registry.current()
    }

    pub fn list(&self) -> Vec<VersionView> {
        self.registry.list()
    }

    pub fn get(&self, name: &VersionName) -> Option<VersionRecord> {
        self.registry.get(name)
    }

    /// Switches the current version and reloads the prediction cache for it.
    pub fn switch_and_reload(&self, name: &VersionName) -> Result<(), PredictionError> {
        self.registry.switch(name)?;
        self.adapter.reload()?;
        Ok(())
    }

    /// Retrains on `sample` and reloads the cache for the new version.
    ///
    /// A reload failure is only logged: the new version is committed and will be
    /// loaded on the next prediction.
    pub fn retrain_and_reload(&self, sample: &LabeledSample) -> Result<RetrainResult, TrainingError> {
        let result = self.engine.retrain(sample)?;
        if let Err(e) = self.adapter.reload() {
            warn!(version = %result.version, error = %e, "reload after retrain failed");
        }
        Ok(result)
    }

    /// Deletes a version and drops it from the prediction cache.
    pub fn delete(&self, name: &VersionName) -> Result<(), RegistryError> {
        self.registry.delete(name)?;
        self.adapter.evict(name);
        Ok(())
    }

    pub fn train_base(&self) -> Result<RetrainResult, TrainingError> {
        let result = self.engine.train_base()?;
        self.adapter.evict(&VersionName::Original);
        Ok(result)
    }

    pub fn predict(
        &self,
        sample: &WaterSample,
        version: Option<&VersionName>,
    ) -> Result<Prediction, PredictionError> {
        self.adapter.predict(sample, version)
    }

    pub fn predict_batch(
        &self,
        samples: &[WaterSample],
        version: Option<&VersionName>,
    ) -> Result<Vec<Prediction>, PredictionError> {
        self.adapter.predict_batch(samples, version)
    }

    /// Predicts every row of a features-only CSV with the current version.
    pub fn predict_file(&self, path: &Path) -> Result<Vec<Prediction>, ManagerError> {
        let samples = read_samples_csv(path)?;
        info!(path = %path.display(), rows = samples.len(), "predicting file");
        Ok(self.adapter.predict_batch(&samples, None)?)
    }

    /// Scores `version` (current if `None`) on a labeled CSV, and cross-validates a
    /// fresh ensemble with the configured hyperparameters on the same scaled rows.
    pub fn evaluate(
        &self,
        version: Option<&VersionName>,
        dataset: &Path,
    ) -> Result<EvaluationReport, ManagerError> {
        let version = version.cloned().unwrap_or_else(|| self.registry.current());
        let pair = self.adapter.artifacts(&version)?;
        let data = Dataset::read_csv(dataset)?;
        let x = match &pair.scaler {
            Some(scaler) => scaler.transform(data.features())?,
            None => data.features().to_vec(),
        };
        let y = data.labels();

        let scored = score_model(&pair.model, &x, y);
        for m in scored.performance() {
            debug!(%version, metric = %m.name, value = m.value, "in-sample metric");
        }
        let cv = &self.settings.cross_validation;
        let splitter = StratifiedKFold::new(cv.folds, cv.random_state)?;
        let scores = cross_val_accuracy(&self.settings.ensemble, &x, y, &splitter)?;
        let report = EvaluationReport::new(&scored, y, &scores);
        info!(
            %version,
            rows = y.len(),
            accuracy = report.training_metrics.accuracy,
            cv_accuracy = report.cross_validation.cv_mean_accuracy,
            "evaluated version"
        );
        Ok(report)
    }
}
