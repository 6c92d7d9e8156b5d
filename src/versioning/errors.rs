use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::error::ErrorClass;
use crate::versioning::VersionName;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("no artifacts registered for version {version}")]
    NotFound { version: VersionName },

    #[error("artifact file {path} for version {version} is missing")]
    MissingFile { version: VersionName, path: PathBuf },

    #[error("model for version {version} is unavailable: {reason}")]
    ModelUnavailable { version: VersionName, reason: String },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode or decode {path}: {source}")]
    Codec {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ArtifactError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::MissingFile { .. } | Self::ModelUnavailable { .. } | Self::Codec { .. } => {
                ErrorClass::Unavailable
            }
            Self::Io { .. } => ErrorClass::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionReason {
    Original,
    Current,
}

impl std::fmt::Display for DeletionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Original => "the Original version is permanent",
            Self::Current => "it is the current version",
        })
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("version {0} not found")]
    VersionNotFound(VersionName),

    #[error("version {name} cannot be deleted: {reason}")]
    DeletionForbidden {
        name: VersionName,
        reason: DeletionReason,
    },

    #[error("version {0} already exists")]
    VersionExists(VersionName),

    #[error("version numbers are exhausted")]
    NamesExhausted,

    #[error("registry metadata {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("registry metadata {path} is inconsistent: {detail}")]
    Inconsistent { path: PathBuf, detail: String },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize registry metadata: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

impl RegistryError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::VersionNotFound(_) | Self::DeletionForbidden { .. } => ErrorClass::NotFound,
            Self::Artifact(e) => e.class(),
            Self::VersionExists(_)
            | Self::NamesExhausted
            | Self::Corrupt { .. }
            | Self::Inconsistent { .. }
            | Self::Io { .. }
            | Self::Serialize(_) => ErrorClass::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_follow_transport_contract() {
        assert_eq!(
            RegistryError::VersionNotFound(VersionName::Numbered(9)).class(),
            ErrorClass::NotFound
        );
        assert_eq!(
            RegistryError::DeletionForbidden {
                name: VersionName::Original,
                reason: DeletionReason::Original
            }
            .class(),
            ErrorClass::NotFound
        );
        let missing = ArtifactError::MissingFile {
            version: VersionName::Original,
            path: "models/model.json".into(),
        };
        assert_eq!(missing.class(), ErrorClass::Unavailable);
        assert_eq!(RegistryError::from(missing).class(), ErrorClass::Unavailable);
    }

    #[test]
    fn messages_name_the_version() {
        let e = RegistryError::DeletionForbidden {
            name: VersionName::Numbered(3),
            reason: DeletionReason::Current,
        };
        assert_eq!(
            e.to_string(),
            "version V3 cannot be deleted: it is the current version"
        );
    }
}
