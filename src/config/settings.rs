use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use schemars::{JsonSchema, Schema, schema_for};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classifiers::EnsembleParams;
use crate::training::CrossValidationParams;
use crate::versioning::{FsArtifactStore, VersionName, VersionRecord};

pub const CONFIG_ENV: &str = "POTABLE_CONFIG";
pub const MODELS_DIR_ENV: &str = "POTABLE_MODELS_DIR";
pub const BASE_DATASET_ENV: &str = "POTABLE_BASE_DATASET";

const METADATA_FILE: &str = "metadata.json";
const INCREMENTAL_FILE: &str = "incremental_training_data.csv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}
fn default_base_dataset() -> PathBuf {
    PathBuf::from("Data-set/train_dataset.csv")
}
fn default_seed_description() -> String {
    "Original ensemble model (RF + XGBoost + GB)".into()
}
fn default_seed_training_samples() -> usize {
    2293
}
fn default_seed_accuracy() -> f64 {
    0.8439
}
fn default_seed_cv_accuracy() -> f64 {
    0.6424
}

/// Metrics recorded for the pre-trained `Original` model when no registry exists yet.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SeedVersion {
    #[serde(default = "default_seed_description")]
    #[schemars(
        title = "Description",
        description = "Description of the Original version.",
        default = "default_seed_description"
    )]
    pub description: String,

    #[serde(default = "default_seed_training_samples")]
    #[schemars(
        title = "Training samples",
        description = "Rows the Original model was trained on.",
        default = "default_seed_training_samples"
    )]
    pub training_samples: usize,

    #[serde(default = "default_seed_accuracy")]
    #[schemars(
        title = "Accuracy",
        description = "Training accuracy of the Original model.",
        range(min = 0.0, max = 1.0),
        default = "default_seed_accuracy"
    )]
    pub accuracy: f64,

    #[serde(default = "default_seed_cv_accuracy")]
    #[schemars(
        title = "CV accuracy",
        description = "Cross-validated accuracy of the Original model.",
        range(min = 0.0, max = 1.0),
        default = "default_seed_cv_accuracy"
    )]
    pub cv_accuracy: f64,
}

impl Default for SeedVersion {
    fn default() -> Self {
        Self {
            description: default_seed_description(),
            training_samples: default_seed_training_samples(),
            accuracy: default_seed_accuracy(),
            cv_accuracy: default_seed_cv_accuracy(),
        }
    }
}

impl SeedVersion {
    pub fn record(&self) -> VersionRecord {
        VersionRecord {
            created_at: Local::now().naive_local(),
            description: self.description.clone(),
            training_samples: self.training_samples,
            incremental_samples: None,
            artifacts: FsArtifactStore::file_names(&VersionName::Original),
            accuracy: self.accuracy,
            cv_accuracy: self.cv_accuracy,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Settings {
    #[serde(default = "default_models_dir")]
    #[schemars(
        with = "String",
        title = "Models directory",
        description = "Holds the Original artifacts; versions/ below it holds the registry, \
                       the incremental table and versioned artifacts.",
        default = "default_models_dir",
        extend("format" = "path")
    )]
    pub models_dir: PathBuf,

    #[serde(default = "default_base_dataset")]
    #[schemars(
        with = "String",
        title = "Base dataset",
        description = "Labeled CSV every training run starts from.",
        default = "default_base_dataset",
        extend("format" = "path", "x-extensions" = ["csv"])
    )]
    pub base_dataset: PathBuf,

    #[serde(default)]
    #[schemars(title = "Original version", description = "Seed record for a new registry.")]
    pub seed: SeedVersion,

    #[serde(default)]
    #[schemars(title = "Ensemble", description = "Hyperparameters of the voting ensemble.")]
    pub ensemble: EnsembleParams,

    #[serde(default)]
    #[schemars(title = "Cross-validation", description = "Fold count and shuffling seed.")]
    pub cross_validation: CrossValidationParams,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            base_dataset: default_base_dataset(),
            seed: SeedVersion::default(),
            ensemble: EnsembleParams::default(),
            cross_validation: CrossValidationParams::default(),
        }
    }
}

impl Settings {
    /// Reads `path` if given (absent fields take defaults), then applies
    /// `POTABLE_MODELS_DIR` and `POTABLE_BASE_DATASET`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Like [`load`](Self::load), taking the file path from `POTABLE_CONFIG`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::load(path.as_deref())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(MODELS_DIR_ENV).filter(|v| !v.is_empty()) {
            self.models_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup(BASE_DATASET_ENV).filter(|v| !v.is_empty()) {
            self.base_dataset = PathBuf::from(path);
        }
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.models_dir.join("versions")
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.versions_dir().join(METADATA_FILE)
    }

    pub fn incremental_path(&self) -> PathBuf {
        self.versions_dir().join(INCREMENTAL_FILE)
    }

    pub fn json_schema() -> Schema {
        schema_for!(Settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::TempDir;

    #[test]
    fn defaults_follow_deployment_layout() {
        let s = Settings::default();
        assert_eq!(s.models_dir, PathBuf::from("models"));
        assert_eq!(s.metadata_path(), PathBuf::from("models/versions/metadata.json"));
        assert_eq!(
            s.incremental_path(),
            PathBuf::from("models/versions/incremental_training_data.csv")
        );
        assert_eq!(s.seed.training_samples, 2293);
        assert_eq!(s.cross_validation.folds, 5);
    }

    #[test]
    fn seed_record_points_at_base_artifacts() {
        let r = SeedVersion::default().record();
        assert_eq!(r.artifacts.model_path, "model.json");
        assert_eq!(r.accuracy, 0.8439);
        assert_eq!(r.cv_accuracy, 0.6424);
        assert_eq!(r.description, "Original ensemble model (RF + XGBoost + GB)");
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("potable.json");
        fs::write(
            &path,
            r#"{"models_dir": "/srv/models", "ensemble": {"random_forest": {"n_estimators": 10}}}"#,
        )
        .unwrap();
        let s = Settings::from_file(&path).unwrap();
        assert_eq!(s.models_dir, PathBuf::from("/srv/models"));
        assert_eq!(s.ensemble.random_forest.n_estimators, 10);
        assert_eq!(s.ensemble.random_forest.max_depth, Some(6));
        assert_eq!(s.base_dataset, default_base_dataset());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("potable.json");
        fs::write(&path, "{").unwrap();
        assert!(matches!(
            Settings::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn overrides_replace_paths() {
        let mut s = Settings::default();
        s.apply_overrides(|key| match key {
            MODELS_DIR_ENV => Some("/tmp/m".into()),
            BASE_DATASET_ENV => Some(String::new()),
            _ => None,
        });
        assert_eq!(s.models_dir, PathBuf::from("/tmp/m"));
        assert_eq!(s.base_dataset, default_base_dataset());
    }

    #[test]
    fn schema_exposes_titles() {
        let v = serde_json::to_value(Settings::json_schema()).unwrap();
        let props = v.get("properties").cloned().unwrap_or(Value::Null);
        assert_eq!(props["models_dir"]["title"], "Models directory");
        assert!(props.get("ensemble").is_some());
    }
}
