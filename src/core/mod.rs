pub mod dataset;
pub mod schema;

pub use dataset::{Dataset, DatasetError, read_samples_csv};
pub use schema::{
    FEATURE_COUNT, FEATURE_NAMES, LABEL_COLUMN, LabeledSample, Potability, SampleError, WaterSample,
};
