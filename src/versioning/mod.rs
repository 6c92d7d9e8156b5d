mod artifact_store;
mod errors;
mod incremental;
mod record;
mod registry;
mod version_name;

pub use artifact_store::{ArtifactPair, ArtifactStore, FsArtifactStore};
pub use errors::{ArtifactError, DeletionReason, RegistryError};
pub use incremental::IncrementalStore;
pub use record::{ArtifactRefs, VersionRecord, VersionView};
pub use registry::VersionRegistry;
pub use version_name::VersionName;
