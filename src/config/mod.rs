mod settings;

pub use settings::{
    BASE_DATASET_ENV, CONFIG_ENV, ConfigError, MODELS_DIR_ENV, SeedVersion, Settings,
};
