mod adapter;
mod cache;
mod prediction;

pub use adapter::PredictionAdapter;
pub use cache::ArtifactCache;
pub use prediction::{Prediction, PredictionError};
