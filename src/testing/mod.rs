mod generator;
mod workspace;

pub use generator::WaterSampleGenerator;
pub use workspace::{Workspace, reference_sample, tiny_ensemble_params};
