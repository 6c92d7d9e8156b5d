pub mod gradient_boosting;
pub mod random_forest;
pub mod soft_voting;

pub use gradient_boosting::{GradientBoosting, GradientBoostingParams};
pub use random_forest::{ClassWeight, RandomForest, RandomForestParams};
pub use soft_voting::{EnsembleParams, Member, SoftVotingEnsemble};
