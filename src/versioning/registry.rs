use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::utils::atomic_file::write_atomic;
use crate::versioning::{
    ArtifactError, ArtifactPair, ArtifactRefs, ArtifactStore, DeletionReason, RegistryError,
    VersionName, VersionRecord, VersionView,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryState {
    current_version: VersionName,
    versions: BTreeMap<VersionName, VersionRecord>,
}

impl RegistryState {
    fn seeded(original: VersionRecord) -> Self {
        Self {
            current_version: VersionName::Original,
            versions: BTreeMap::from([(VersionName::Original, original)]),
        }
    }

    fn check(&self, path: &Path) -> Result<(), RegistryError> {
        let inconsistent = |detail: String| RegistryError::Inconsistent {
            path: path.to_path_buf(),
            detail,
        };
        if !self.versions.contains_key(&VersionName::Original) {
            return Err(inconsistent("no Original version".into()));
        }
        if !self.versions.contains_key(&self.current_version) {
            return Err(inconsistent(format!(
                "current version {} is not registered",
                self.current_version
            )));
        }
        Ok(())
    }
}

/// Persistent map of version name to metadata plus the current-version pointer.
///
/// Every mutation runs under one lock: it edits a copy of the state, rewrites the
/// metadata file atomically, and only then publishes the copy. A failed write leaves
/// both the file and the in-memory view untouched.
pub struct VersionRegistry {
    metadata_path: PathBuf,
    store: Arc<dyn ArtifactStore>,
    state: Mutex<RegistryState>,
}

impl VersionRegistry {
    /// Reads `metadata_path`, or seeds it with a single `Original` record when absent.
    pub fn open(
        metadata_path: impl Into<PathBuf>,
        store: Arc<dyn ArtifactStore>,
        original: VersionRecord,
    ) -> Result<Self, RegistryError> {
        let metadata_path = metadata_path.into();
        let state = if metadata_path.exists() {
            let bytes = fs::read(&metadata_path).map_err(|source| RegistryError::Io {
                path: metadata_path.clone(),
                source,
            })?;
            let state: RegistryState =
                serde_json::from_slice(&bytes).map_err(|source| RegistryError::Corrupt {
                    path: metadata_path.clone(),
                    source,
                })?;
            state.check(&metadata_path)?;
            info!(
                path = %metadata_path.display(),
                versions = state.versions.len(),
                current = %state.current_version,
                "opened version registry"
            );
            state
        } else {
            let state = RegistryState::seeded(original);
            persist(&metadata_path, &state)?;
            info!(path = %metadata_path.display(), "seeded version registry with Original");
            state
        };

        Ok(Self {
            metadata_path,
            store,
            state: Mutex::new(state),
        })
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn commit(
        &self,
        guard: &mut MutexGuard<'_, RegistryState>,
        next: RegistryState,
    ) -> Result<(), RegistryError> {
        persist(&self.metadata_path, &next)?;
        **guard = next;
        Ok(())
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    pub fn current(&self) -> VersionName {
        self.lock().current_version.clone()
    }

    /// Versions in display order, each flagged against the current pointer.
    pub fn list(&self) -> Vec<VersionView> {
        let state = self.lock();
        state
            .versions
            .iter()
            .map(|(name, record)| {
                VersionView::new(name.clone(), record, *name == state.current_version)
            })
            .collect()
    }

    pub fn get(&self, name: &VersionName) -> Option<VersionRecord> {
        self.lock().versions.get(name).cloned()
    }

    pub fn contains(&self, name: &VersionName) -> bool {
        self.lock().versions.contains_key(name)
    }

    /// Points `current` at `name`. Cached models are not touched.
    pub fn switch(&self, name: &VersionName) -> Result<(), RegistryError> {
        let mut guard = self.lock();
        if !guard.versions.contains_key(name) {
            return Err(RegistryError::VersionNotFound(name.clone()));
        }
        let mut next = guard.clone();
        next.current_version = name.clone();
        self.commit(&mut guard, next)?;
        info!(version = %name, "switched current version");
        Ok(())
    }

    pub fn register(&self, name: VersionName, record: VersionRecord) -> Result<(), RegistryError> {
        let mut guard = self.lock();
        if guard.versions.contains_key(&name) {
            return Err(RegistryError::VersionExists(name));
        }
        let mut next = guard.clone();
        next.versions.insert(name.clone(), record);
        self.commit(&mut guard, next)?;
        info!(version = %name, "registered version");
        Ok(())
    }

    /// Removes a version and its artifacts. `Original` and the current version are kept.
    pub fn delete(&self, name: &VersionName) -> Result<(), RegistryError> {
        let mut guard = self.lock();
        if name.is_original() {
            return Err(RegistryError::DeletionForbidden {
                name: name.clone(),
                reason: DeletionReason::Original,
            });
        }
        if *name == guard.current_version {
            return Err(RegistryError::DeletionForbidden {
                name: name.clone(),
                reason: DeletionReason::Current,
            });
        }
        let Some(record) = guard.versions.get(name) else {
            return Err(RegistryError::VersionNotFound(name.clone()));
        };

        self.store.delete(name, &record.artifacts)?;
        let mut next = guard.clone();
        next.versions.remove(name);
        self.commit(&mut guard, next)?;
        info!(version = %name, "deleted version");
        Ok(())
    }

    pub fn next_version_name(&self) -> Option<VersionName> {
        VersionName::next_after(self.lock().versions.keys())
    }

    /// Mints the next name, saves `pair` under it, registers the record built by
    /// `make_record` and makes it current, all under one lock.
    ///
    /// An existing version is never overwritten. If the metadata write fails the
    /// freshly saved artifacts are removed again.
    pub fn commit_new_version<F>(
        &self,
        pair: &ArtifactPair,
        make_record: F,
    ) -> Result<VersionName, RegistryError>
    where
        F: FnOnce(&VersionName, ArtifactRefs) -> VersionRecord,
    {
        let mut guard = self.lock();
        let name =
            VersionName::next_after(guard.versions.keys()).ok_or(RegistryError::NamesExhausted)?;
        if guard.versions.contains_key(&name) {
            return Err(RegistryError::VersionExists(name));
        }
        let refs = self.store.save(&name, pair)?;

        let mut next = guard.clone();
        next.versions.insert(name.clone(), make_record(&name, refs.clone()));
        next.current_version = name.clone();
        if let Err(e) = self.commit(&mut guard, next) {
            if let Err(cleanup) = self.store.delete(&name, &refs) {
                warn!(version = %name, error = %cleanup, "failed to remove orphaned artifacts");
            }
            return Err(e);
        }
        info!(version = %name, "committed new current version");
        Ok(name)
    }

    /// Overwrites the artifacts of an existing version and updates its record.
    pub fn replace_artifacts<F>(
        &self,
        name: &VersionName,
        pair: &ArtifactPair,
        update: F,
    ) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut VersionRecord),
    {
        let mut guard = self.lock();
        if !guard.versions.contains_key(name) {
            return Err(RegistryError::VersionNotFound(name.clone()));
        }
        let refs = self.store.save(name, pair)?;
        let mut next = guard.clone();
        if let Some(record) = next.versions.get_mut(name) {
            record.artifacts = refs;
            update(record);
        }
        self.commit(&mut guard, next)?;
        info!(version = %name, "replaced artifacts");
        Ok(())
    }

    /// Loads the artifact pair registered for `name`.
    pub fn load_artifacts(&self, name: &VersionName) -> Result<ArtifactPair, ArtifactError> {
        let refs = self
            .get(name)
            .map(|r| r.artifacts)
            .ok_or_else(|| ArtifactError::NotFound {
                version: name.clone(),
            })?;
        self.store.load(name, &refs)
    }
}

fn persist(path: &Path, state: &RegistryState) -> Result<(), RegistryError> {
    let bytes = serde_json::to_vec_pretty(state).map_err(RegistryError::Serialize)?;
    write_atomic(path, &bytes).map_err(|source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifiers::{Classifier, MajorityClass};
    use crate::versioning::FsArtifactStore;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn record(description: &str, training_samples: usize) -> VersionRecord {
        VersionRecord {
            created_at: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            description: description.into(),
            training_samples,
            incremental_samples: None,
            artifacts: FsArtifactStore::file_names(&VersionName::Original),
            accuracy: 0.8439,
            cv_accuracy: 0.6424,
        }
    }

    fn pair(class: usize) -> ArtifactPair {
        ArtifactPair::new(MajorityClass::new(class, 2).into(), None)
    }

    struct Fixture {
        dir: TempDir,
        registry: VersionRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let registry = Self::open(&dir);
            Self { dir, registry }
        }

        fn open(dir: &TempDir) -> VersionRegistry {
            let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(dir.path()));
            VersionRegistry::open(
                dir.path().join("versions").join("metadata.json"),
                store,
                record("Original ensemble model", 2293),
            )
            .unwrap()
        }

        fn retrain(&self, class: usize) -> VersionName {
            self.registry
                .commit_new_version(&pair(class), |name, artifacts| VersionRecord {
                    description: format!("test {name}"),
                    artifacts,
                    ..record("", 2294)
                })
                .unwrap()
        }
    }

    #[test]
    fn bootstrap_lists_single_current_original() {
        let f = Fixture::new();
        let list = f.registry.list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].version, VersionName::Original);
        assert!(list[0].is_current);
        assert_eq!(list[0].training_samples, 2293);
        assert!(f.registry.metadata_path().exists());
    }

    #[test]
    fn persisted_file_uses_flat_metadata_layout() {
        let f = Fixture::new();
        let text = fs::read_to_string(f.registry.metadata_path()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["current_version"], "Original");
        assert_eq!(v["versions"]["Original"]["model_path"], "model.json");
        assert_eq!(v["versions"]["Original"]["cv_accuracy"], 0.6424);
    }

    #[test]
    fn switch_to_unknown_fails_without_side_effects() {
        let f = Fixture::new();
        let err = f.registry.switch(&"does-not-exist".into()).unwrap_err();
        assert!(matches!(err, RegistryError::VersionNotFound(_)));
        assert_eq!(f.registry.current(), VersionName::Original);
    }

    #[test]
    fn commits_mint_increasing_names_and_switch() {
        let f = Fixture::new();
        let v1 = f.retrain(0);
        let v2 = f.retrain(1);
        assert_eq!(v1, VersionName::Numbered(1));
        assert_eq!(v2, VersionName::Numbered(2));
        assert_eq!(f.registry.current(), v2);

        f.registry.switch(&v1).unwrap();
        assert_eq!(f.registry.current(), v1);
        let shown: Vec<String> = f.registry.list().iter().map(|v| v.version.to_string()).collect();
        assert_eq!(shown, ["Original", "V1", "V2"]);
    }

    #[test]
    fn state_survives_reopen() {
        let f = Fixture::new();
        let v1 = f.retrain(1);
        f.retrain(0);
        f.registry.switch(&v1).unwrap();

        let reopened = Fixture::open(&f.dir);
        assert_eq!(reopened.current(), v1);
        assert_eq!(reopened.list().len(), 3);
        let pair = reopened.load_artifacts(&v1).unwrap();
        assert_eq!(pair.model.predict(&[0.0]), 1);
    }

    #[test]
    fn delete_rules() {
        let f = Fixture::new();
        let v1 = f.retrain(0);
        let v2 = f.retrain(1);

        assert!(matches!(
            f.registry.delete(&VersionName::Original),
            Err(RegistryError::DeletionForbidden {
                reason: DeletionReason::Original,
                ..
            })
        ));
        assert!(matches!(
            f.registry.delete(&v2),
            Err(RegistryError::DeletionForbidden {
                reason: DeletionReason::Current,
                ..
            })
        ));
        assert!(matches!(
            f.registry.delete(&VersionName::Numbered(9)),
            Err(RegistryError::VersionNotFound(_))
        ));

        f.registry.delete(&v1).unwrap();
        assert!(!f.registry.contains(&v1));
        assert!(!f.dir.path().join("versions").join("model_V1.json").exists());
        assert_eq!(f.registry.next_version_name(), Some(VersionName::Numbered(3)));
    }

    #[test]
    fn register_rejects_existing_names() {
        let f = Fixture::new();
        let err = f
            .registry
            .register(VersionName::Original, record("dup", 1))
            .unwrap_err();
        assert!(matches!(err, RegistryError::VersionExists(_)));

        f.registry
            .register(VersionName::Numbered(5), record("imported", 1))
            .unwrap();
        assert_eq!(f.registry.next_version_name(), Some(VersionName::Numbered(6)));
        assert_eq!(f.registry.current(), VersionName::Original);
    }

    #[test]
    fn exhausted_numbering_leaves_the_last_version_intact() {
        let f = Fixture::new();
        let last = VersionName::Numbered(u32::MAX);
        f.registry
            .register(last.clone(), VersionRecord {
                artifacts: FsArtifactStore::file_names(&last),
                ..record("imported", 222)
            })
            .unwrap();
        f.registry.store().save(&last, &pair(0)).unwrap();

        let err = f
            .registry
            .commit_new_version(&pair(1), |_, artifacts| VersionRecord {
                artifacts,
                ..record("clash", 1)
            })
            .unwrap_err();
        assert!(matches!(err, RegistryError::NamesExhausted));
        assert_eq!(f.registry.list().len(), 2);
        assert_eq!(f.registry.current(), VersionName::Original);
        assert_eq!(f.registry.get(&last).unwrap().training_samples, 222);
        let kept = f.registry.load_artifacts(&last).unwrap();
        assert_eq!(kept.model.predict(&[0.0]), 0);
    }

    #[test]
    fn load_of_unknown_version_is_not_found() {
        let f = Fixture::new();
        let err = f.registry.load_artifacts(&VersionName::Numbered(3)).unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound { .. }));
    }

    #[test]
    fn corrupt_metadata_fails_loudly() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("versions").join("metadata.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"{ not json").unwrap();
        let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(dir.path()));
        let err = VersionRegistry::open(&path, store, record("x", 1)).err().unwrap();
        assert!(matches!(err, RegistryError::Corrupt { .. }));
    }

    #[test]
    fn dangling_current_pointer_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metadata.json");
        let mut state = RegistryState::seeded(record("x", 1));
        state.current_version = VersionName::Numbered(4);
        fs::write(&path, serde_json::to_vec(&state).unwrap()).unwrap();
        let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(dir.path()));
        let err = VersionRegistry::open(&path, store, record("x", 1)).err().unwrap();
        assert!(matches!(err, RegistryError::Inconsistent { .. }));
    }

    #[test]
    fn replace_artifacts_updates_record() {
        let f = Fixture::new();
        f.registry
            .replace_artifacts(&VersionName::Original, &pair(1), |r| {
                r.accuracy = 0.9;
                r.training_samples = 100;
            })
            .unwrap();
        let r = f.registry.get(&VersionName::Original).unwrap();
        assert_eq!(r.accuracy, 0.9);
        assert_eq!(r.training_samples, 100);
        assert!(r.artifacts.scaler_path.is_none());
        assert!(f.dir.path().join("model.json").exists());
    }

    #[test]
    fn concurrent_commits_never_clash() {
        let f = Fixture::new();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| f.retrain(1));
            }
        });
        let names: Vec<VersionName> = f.registry.list().into_iter().map(|v| v.version).collect();
        assert_eq!(names.len(), 5);
        assert_eq!(names.last(), Some(&VersionName::Numbered(4)));
    }
}
