mod error;
mod pipeline;
mod result;
mod retrainer;

pub use error::TrainingError;
pub use pipeline::CrossValidationParams;
pub use result::RetrainResult;
pub use retrainer::RetrainingEngine;
