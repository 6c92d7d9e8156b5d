use std::path::PathBuf;

use tempfile::TempDir;

use crate::classifiers::EnsembleParams;
use crate::classifiers::classifier::Learner;
use crate::classifiers::trees::MaxFeatures;
use crate::config::Settings;
use crate::core::{Dataset, LabeledSample, Potability, WaterSample};
use crate::preprocessing::StandardScaler;
use crate::testing::WaterSampleGenerator;
use crate::training::CrossValidationParams;
use crate::versioning::{ArtifactPair, ArtifactStore, FsArtifactStore, VersionName};

/// Throwaway deployment: a base CSV, settings pointing into a temp dir and
/// fitted `Original` artifacts. The registry itself is created on first open.
pub struct Workspace {
    pub dir: TempDir,
    pub settings: Settings,
    pub base: Dataset,
}

impl Workspace {
    pub fn new(base_rows: usize) -> Self {
        let ws = Self::without_artifacts(base_rows);
        let (scaler, x) = StandardScaler::fit_transform(ws.base.features()).unwrap();
        let model = ws.settings.ensemble.fit(&x, ws.base.labels()).unwrap();
        FsArtifactStore::new(&ws.settings.models_dir)
            .save(
                &VersionName::Original,
                &ArtifactPair::new(model.into(), Some(scaler)),
            )
            .unwrap();
        ws
    }

    /// Base CSV and settings only; loading `Original` fails until something trains it.
    pub fn without_artifacts(base_rows: usize) -> Self {
        let dir = TempDir::new().unwrap();
        let base = WaterSampleGenerator::clean(17).dataset(base_rows);
        let base_path = dir.path().join("train_dataset.csv");
        base.write_csv(&base_path).unwrap();

        let settings = Settings {
            models_dir: dir.path().join("models"),
            base_dataset: base_path,
            ensemble: tiny_ensemble_params(),
            cross_validation: CrossValidationParams {
                folds: 3,
                random_state: 42,
            },
            ..Settings::default()
        };
        Self {
            dir,
            settings,
            base,
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Ensemble small enough to fit in milliseconds yet able to learn threshold concepts.
pub fn tiny_ensemble_params() -> EnsembleParams {
    let mut p = EnsembleParams::default();

    let rf = &mut p.random_forest;
    rf.n_estimators = 5;
    rf.max_depth = Some(3);
    rf.min_samples_split = 4;
    rf.min_samples_leaf = 2;
    rf.max_features = MaxFeatures::All;

    for gb in [&mut p.regularized_boosting, &mut p.gradient_boosting] {
        gb.n_estimators = 10;
        gb.learning_rate = 0.3;
        gb.max_depth = 2;
        gb.min_samples_split = 4;
        gb.min_samples_leaf = 2;
        gb.subsample = 1.0;
        gb.colsample_bytree = 1.0;
        gb.min_child_weight = gb.min_child_weight.min(0.5);
        gb.gamma = 0.0;
    }
    p
}

/// A clean, potable measurement in the middle of every accepted range.
pub fn reference_sample() -> LabeledSample {
    LabeledSample::new(
        WaterSample {
            ph: 7.0,
            hardness: 200.0,
            solids: 20000.0,
            chloramines: 7.5,
            sulfate: 350.0,
            conductivity: 400.0,
            organic_carbon: 14.0,
            trihalomethanes: 70.0,
            turbidity: 4.0,
        },
        Potability::Potable,
    )
}
