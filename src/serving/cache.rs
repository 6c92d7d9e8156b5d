use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::versioning::{ArtifactError, ArtifactPair, VersionName};

/// Process-lifetime memo of loaded artifact pairs, keyed by version name.
///
/// Nothing expires on its own. Entries leave only through [`invalidate`](Self::invalidate)
/// or [`clear`](Self::clear).
#[derive(Debug, Default)]
pub struct ArtifactCache {
    entries: RwLock<HashMap<VersionName, Arc<ArtifactPair>>>,
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached pair for `version`, calling `load` on a miss.
    ///
    /// The loader runs without holding the lock. If two callers miss at once the
    /// first insert wins and both get the same `Arc`.
    pub fn get_or_load<F>(
        &self,
        version: &VersionName,
        load: F,
    ) -> Result<Arc<ArtifactPair>, ArtifactError>
    where
        F: FnOnce() -> Result<ArtifactPair, ArtifactError>,
    {
        if let Some(hit) = self.get(version) {
            debug!(%version, "artifact cache hit");
            return Ok(hit);
        }
        debug!(%version, "artifact cache miss");
        let loaded = Arc::new(load()?);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.entry(version.clone()).or_insert(loaded).clone())
    }

    pub fn get(&self, version: &VersionName) -> Option<Arc<ArtifactPair>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(version)
            .cloned()
    }

    pub fn contains(&self, version: &VersionName) -> bool {
        self.get(version).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn invalidate(&self, version: &VersionName) -> bool {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(version)
            .is_some();
        if removed {
            debug!(%version, "evicted cached artifacts");
        }
        removed
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let n = entries.len();
        entries.clear();
        debug!(evicted = n, "cleared artifact cache");
    }
}
