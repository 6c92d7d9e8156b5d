pub mod classifier;
pub mod ensemble;
pub mod majority_class;
pub mod model;
pub mod trees;

pub use classifier::{Classifier, FitError, Learner};
pub use ensemble::{EnsembleParams, SoftVotingEnsemble};
pub use majority_class::{MajorityClass, MajorityClassParams};
pub use model::PotabilityModel;
