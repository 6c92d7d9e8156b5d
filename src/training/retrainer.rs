use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use chrono::Local;
use tracing::{info, warn};

use crate::classifiers::EnsembleParams;
use crate::core::{Dataset, LabeledSample};
use crate::training::pipeline::{CrossValidationParams, PipelineError, fit_and_score};
use crate::training::{RetrainResult, TrainingError};
use crate::versioning::{IncrementalStore, VersionName, VersionRecord, VersionRegistry};

/// Builds new versions from the base dataset plus every accumulated sample.
///
/// Each run refits scaler and ensemble from scratch on the full combined table,
/// so its cost grows with the number of accumulated samples. Runs are serialized.
pub struct RetrainingEngine {
    registry: Arc<VersionRegistry>,
    incremental: IncrementalStore,
    base_dataset: PathBuf,
    ensemble: EnsembleParams,
    cross_validation: CrossValidationParams,
    running: Mutex<()>,
}

impl RetrainingEngine {
    pub fn new(
        registry: Arc<VersionRegistry>,
        incremental: IncrementalStore,
        base_dataset: impl Into<PathBuf>,
        ensemble: EnsembleParams,
        cross_validation: CrossValidationParams,
    ) -> Self {
        Self {
            registry,
            incremental,
            base_dataset: base_dataset.into(),
            ensemble,
            cross_validation,
            running: Mutex::new(()),
        }
    }

    pub fn base_dataset(&self) -> &Path {
        &self.base_dataset
    }

    pub fn incremental(&self) -> &IncrementalStore {
        &self.incremental
    }

    /// Appends `sample`, refits on base + accumulated samples, and commits the result
    /// as the new current version.
    ///
    /// On failure the registry is left as it was. The appended sample is kept, so
    /// resubmitting the same sample after a failure stores it twice.
    pub fn retrain(&self, sample: &LabeledSample) -> Result<RetrainResult, TrainingError> {
        sample.sample.validate()?;
        let _running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        let started = Instant::now();
        self.run_retrain(sample, started).map_err(|e| {
            warn!(error = %e, "retraining failed");
            TrainingError::failure(e)
        })
    }

    fn run_retrain(
        &self,
        sample: &LabeledSample,
        started: Instant,
    ) -> Result<RetrainResult, PipelineError> {
        let current = self.registry.current();
        self.registry.load_artifacts(&current)?;

        self.incremental.append(sample)?;

        let mut combined = Dataset::read_csv(&self.base_dataset)?;
        let base_rows = combined.len();
        let accumulated = self.incremental.load()?;
        combined.extend_from(&accumulated);
        let incremental_samples = accumulated.len();
        let training_samples = combined.len();
        info!(
            from = %current,
            base_rows,
            incremental_samples,
            training_samples,
            "retraining on combined dataset"
        );

        let fitted = fit_and_score(&self.ensemble, &self.cross_validation, &combined)?;
        let accuracy = fitted.accuracy;
        let cv_accuracy = fitted.cv.mean();

        let version = self
            .registry
            .commit_new_version(&fitted.pair, |_, artifacts| VersionRecord {
                created_at: Local::now().naive_local(),
                description: format!(
                    "Retrained with {incremental_samples} additional sample(s)"
                ),
                training_samples,
                incremental_samples: Some(incremental_samples),
                artifacts,
                accuracy,
                cv_accuracy,
            })?;

        info!(
            %version,
            accuracy,
            cv_accuracy,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "retraining finished"
        );
        Ok(RetrainResult {
            success: true,
            message: format!(
                "Model {version} trained successfully with {training_samples} samples"
            ),
            version,
            training_samples,
            incremental_samples,
            accuracy,
            cv_accuracy,
            cv_scores: fitted.cv.folds,
        })
    }

    /// Fits on the base dataset alone and stores the result as the `Original` version.
    pub fn train_base(&self) -> Result<RetrainResult, TrainingError> {
        let _running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        let started = Instant::now();
        self.run_train_base(started).map_err(|e| {
            warn!(error = %e, "base training failed");
            TrainingError::failure(e)
        })
    }

    fn run_train_base(&self, started: Instant) -> Result<RetrainResult, PipelineError> {
        let base = Dataset::read_csv(&self.base_dataset)?;
        let training_samples = base.len();
        info!(rows = training_samples, "training base model");

        let fitted = fit_and_score(&self.ensemble, &self.cross_validation, &base)?;
        let accuracy = fitted.accuracy;
        let cv_accuracy = fitted.cv.mean();
        self.registry
            .replace_artifacts(&VersionName::Original, &fitted.pair, |record| {
                record.created_at = Local::now().naive_local();
                record.training_samples = training_samples;
                record.accuracy = accuracy;
                record.cv_accuracy = cv_accuracy;
            })?;

        info!(
            accuracy,
            cv_accuracy,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "base model stored as Original"
        );
        Ok(RetrainResult {
            success: true,
            version: VersionName::Original,
            training_samples,
            incremental_samples: 0,
            accuracy,
            cv_accuracy,
            cv_scores: fitted.cv.folds,
            message: format!("Original model trained successfully with {training_samples} samples"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Potability, SampleError};
    use crate::testing::{Workspace, reference_sample};
    use crate::versioning::{ArtifactStore, FsArtifactStore};

    fn engine(ws: &Workspace) -> RetrainingEngine {
        let s = &ws.settings;
        let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(&s.models_dir));
        let registry =
            Arc::new(VersionRegistry::open(s.metadata_path(), store, s.seed.record()).unwrap());
        RetrainingEngine::new(
            registry,
            IncrementalStore::new(s.incremental_path()),
            &s.base_dataset,
            s.ensemble.clone(),
            s.cross_validation.clone(),
        )
    }

    #[test]
    fn first_retrain_creates_current_v1() {
        let ws = Workspace::new(60);
        let engine = engine(&ws);

        let result = engine.retrain(&reference_sample()).unwrap();
        assert!(result.success);
        assert_eq!(result.version, VersionName::Numbered(1));
        assert_eq!(result.training_samples, 61);
        assert_eq!(result.incremental_samples, 1);
        assert_eq!(result.cv_scores.len(), 3);
        assert!((0.0..=1.0).contains(&result.accuracy));
        assert_eq!(
            result.message,
            "Model V1 trained successfully with 61 samples"
        );

        let registry = &engine.registry;
        assert_eq!(registry.current(), VersionName::Numbered(1));
        let record = registry.get(&VersionName::Numbered(1)).unwrap();
        assert_eq!(record.description, "Retrained with 1 additional sample(s)");
        assert_eq!(record.incremental_samples, Some(1));
        assert_eq!(record.artifacts.model_path, "model_V1.json");
        assert!(registry.load_artifacts(&VersionName::Numbered(1)).is_ok());
    }

    #[test]
    fn successive_retrains_accumulate_samples() {
        let ws = Workspace::new(60);
        let engine = engine(&ws);
        let mut sample = reference_sample();

        let first = engine.retrain(&sample).unwrap();
        sample.label = Potability::NotPotable;
        sample.sample.ph = 5.0;
        let second = engine.retrain(&sample).unwrap();

        assert_eq!(second.version, VersionName::Numbered(2));
        assert_eq!(second.training_samples, first.training_samples + 1);
        assert_eq!(second.incremental_samples, 2);
        assert_eq!(engine.incremental().count().unwrap(), 2);
        assert_eq!(engine.registry.list().len(), 3);
        assert!(engine.registry.get(&VersionName::Numbered(1)).is_some());
    }

    #[test]
    fn invalid_sample_is_rejected_before_anything_is_written() {
        let ws = Workspace::new(30);
        let engine = engine(&ws);
        let mut sample = reference_sample();
        sample.sample.ph = 15.0;

        let err = engine.retrain(&sample).unwrap_err();
        assert!(matches!(
            err,
            TrainingError::InvalidSample(SampleError::OutOfRange { feature: "ph", .. })
        ));
        assert_eq!(engine.incremental().count().unwrap(), 0);
        assert_eq!(engine.registry.list().len(), 1);
    }

    #[test]
    fn unloadable_current_model_aborts_without_append() {
        let ws = Workspace::without_artifacts(30);
        let engine = engine(&ws);

        let err = engine.retrain(&reference_sample()).unwrap_err();
        assert!(err.to_string().starts_with("Retraining error: "), "{err}");
        assert_eq!(engine.incremental().count().unwrap(), 0);
        assert_eq!(engine.registry.current(), VersionName::Original);
    }

    #[test]
    fn failed_run_keeps_registry_and_the_appended_sample() {
        let ws = Workspace::new(30);
        let engine = engine(&ws);
        std::fs::remove_file(&ws.settings.base_dataset).unwrap();

        let err = engine.retrain(&reference_sample()).unwrap_err();
        assert!(matches!(err, TrainingError::Failure(_)));
        assert_eq!(engine.registry.current(), VersionName::Original);
        assert_eq!(engine.registry.list().len(), 1);
        assert_eq!(engine.incremental().count().unwrap(), 1);
    }

    #[test]
    fn train_base_refreshes_original_in_place() {
        let ws = Workspace::without_artifacts(40);
        let engine = engine(&ws);

        let result = engine.train_base().unwrap();
        assert_eq!(result.version, VersionName::Original);
        assert_eq!(result.training_samples, 40);
        assert_eq!(result.incremental_samples, 0);

        let record = engine.registry.get(&VersionName::Original).unwrap();
        assert_eq!(record.training_samples, 40);
        assert_eq!(record.accuracy, result.accuracy);
        assert!(engine.registry.load_artifacts(&VersionName::Original).is_ok());
        assert_eq!(engine.registry.list().len(), 1);

        let next = engine.retrain(&reference_sample()).unwrap();
        assert_eq!(next.version, VersionName::Numbered(1));
    }
}
