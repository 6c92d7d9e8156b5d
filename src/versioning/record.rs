use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::versioning::VersionName;

/// File names of a version's artifacts, relative to the directory the store keeps them in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRefs {
    pub model_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler_path: Option<String>,
}

/// Metadata kept for every registered version. The name is the registry key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub created_at: NaiveDateTime,
    pub description: String,
    pub training_samples: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incremental_samples: Option<usize>,
    #[serde(flatten)]
    pub artifacts: ArtifactRefs,
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default)]
    pub cv_accuracy: f64,
}

/// One row of the version listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionView {
    pub version: VersionName,
    pub created_at: NaiveDateTime,
    pub description: String,
    pub training_samples: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incremental_samples: Option<usize>,
    pub accuracy: f64,
    pub cv_accuracy: f64,
    pub is_current: bool,
}

impl VersionView {
    pub fn new(version: VersionName, record: &VersionRecord, is_current: bool) -> Self {
        Self {
            version,
            created_at: record.created_at,
            description: record.description.clone(),
            training_samples: record.training_samples,
            incremental_samples: record.incremental_samples,
            accuracy: record.accuracy,
            cv_accuracy: record.cv_accuracy,
            is_current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_flat_metadata_entry() {
        let v = json!({
            "created_at": "2025-01-15T10:30:00.123456",
            "description": "Original ensemble model (RF + XGBoost + GB)",
            "training_samples": 2293,
            "model_path": "model.json",
            "scaler_path": "scaler.json",
            "accuracy": 0.8439,
            "cv_accuracy": 0.6424
        });
        let r: VersionRecord = serde_json::from_value(v).unwrap();
        assert_eq!(r.training_samples, 2293);
        assert_eq!(r.incremental_samples, None);
        assert_eq!(r.artifacts.scaler_path.as_deref(), Some("scaler.json"));
    }

    #[test]
    fn missing_scaler_and_metrics_default() {
        let v = json!({
            "created_at": "2025-01-15T10:30:00",
            "description": "hard-label model",
            "training_samples": 10,
            "model_path": "model_V2.json"
        });
        let r: VersionRecord = serde_json::from_value(v).unwrap();
        assert!(r.artifacts.scaler_path.is_none());
        assert_eq!(r.accuracy, 0.0);

        let out = serde_json::to_value(&r).unwrap();
        assert!(out.get("scaler_path").is_none());
        assert_eq!(out["model_path"], "model_V2.json");
    }
}
