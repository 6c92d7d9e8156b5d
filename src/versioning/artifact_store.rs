use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classifiers::PotabilityModel;
use crate::preprocessing::StandardScaler;
use crate::utils::atomic_file::write_atomic;
use crate::versioning::{ArtifactError, ArtifactRefs, VersionName};

/// A fitted model together with the scaler its inputs must pass through, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactPair {
    pub model: PotabilityModel,
    pub scaler: Option<StandardScaler>,
}

impl ArtifactPair {
    pub fn new(model: PotabilityModel, scaler: Option<StandardScaler>) -> Self {
        Self { model, scaler }
    }
}

/// Owns artifact bytes. Records only carry the references handed back by [`save`](Self::save).
pub trait ArtifactStore: Send + Sync {
    fn save(&self, version: &VersionName, pair: &ArtifactPair)
    -> Result<ArtifactRefs, ArtifactError>;

    fn load(&self, version: &VersionName, refs: &ArtifactRefs)
    -> Result<ArtifactPair, ArtifactError>;

    /// Removes the files behind `refs`. Files that are already gone are not an error.
    fn delete(&self, version: &VersionName, refs: &ArtifactRefs) -> Result<(), ArtifactError>;
}

/// JSON artifacts on disk.
///
/// `Original` lives in the base directory as `model.json`/`scaler.json`; every other
/// version lives in `versions/` as `model_<name>.json`/`scaler_<name>.json`.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    base_dir: PathBuf,
    versions_dir: PathBuf,
}

impl FsArtifactStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let versions_dir = base_dir.join("versions");
        Self {
            base_dir,
            versions_dir,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn versions_dir(&self) -> &Path {
        &self.versions_dir
    }

    pub fn dir_for(&self, version: &VersionName) -> &Path {
        if version.is_original() {
            &self.base_dir
        } else {
            &self.versions_dir
        }
    }

    pub fn file_names(version: &VersionName) -> ArtifactRefs {
        if version.is_original() {
            ArtifactRefs {
                model_path: "model.json".into(),
                scaler_path: Some("scaler.json".into()),
            }
        } else {
            ArtifactRefs {
                model_path: format!("model_{version}.json"),
                scaler_path: Some(format!("scaler_{version}.json")),
            }
        }
    }

    fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ArtifactError> {
        let bytes = serde_json::to_vec(value).map_err(|source| ArtifactError::Codec {
            path: path.to_path_buf(),
            source,
        })?;
        write_atomic(path, &bytes).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn read_json<T: DeserializeOwned>(
        version: &VersionName,
        path: &Path,
    ) -> Result<T, ArtifactError> {
        let bytes = fs::read(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ArtifactError::MissingFile {
                version: version.clone(),
                path: path.to_path_buf(),
            },
            _ => ArtifactError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Codec {
            path: path.to_path_buf(),
            source,
        })
    }

    fn remove(path: &Path) -> Result<(), ArtifactError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ArtifactError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl ArtifactStore for FsArtifactStore {
    fn save(
        &self,
        version: &VersionName,
        pair: &ArtifactPair,
    ) -> Result<ArtifactRefs, ArtifactError> {
        let dir = self.dir_for(version);
        let mut refs = Self::file_names(version);
        let model_path = dir.join(&refs.model_path);
        let replacing = model_path.exists();

        Self::write_json(&model_path, &pair.model)?;
        match &pair.scaler {
            Some(scaler) => {
                if let Some(name) = &refs.scaler_path {
                    if let Err(e) = Self::write_json(&dir.join(name), scaler) {
                        // A new version must not leave a lone model file behind.
                        if !replacing {
                            if let Err(cleanup) = Self::remove(&model_path) {
                                warn!(%version, error = %cleanup, "failed to remove partial artifacts");
                            }
                        }
                        return Err(e);
                    }
                }
            }
            None => refs.scaler_path = None,
        }
        info!(%version, dir = %dir.display(), model = %refs.model_path, "saved artifacts");
        Ok(refs)
    }

    fn load(
        &self,
        version: &VersionName,
        refs: &ArtifactRefs,
    ) -> Result<ArtifactPair, ArtifactError> {
        let dir = self.dir_for(version);
        let model: PotabilityModel = Self::read_json(version, &dir.join(&refs.model_path))?;
        let scaler = refs
            .scaler_path
            .as_ref()
            .map(|name| Self::read_json::<StandardScaler>(version, &dir.join(name)))
            .transpose()?;
        debug!(%version, kind = model.kind(), scaled = scaler.is_some(), "loaded artifacts");
        Ok(ArtifactPair { model, scaler })
    }

    fn delete(&self, version: &VersionName, refs: &ArtifactRefs) -> Result<(), ArtifactError> {
        let dir = self.dir_for(version);
        Self::remove(&dir.join(&refs.model_path))?;
        if let Some(name) = &refs.scaler_path {
            Self::remove(&dir.join(name))?;
        }
        info!(%version, "deleted artifacts");
        Ok(())
    }
}
