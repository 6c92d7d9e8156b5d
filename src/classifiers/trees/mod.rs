mod boosted_tree;
mod decision_tree;
mod node;
pub mod sampling;
pub mod split_criteria;

pub use boosted_tree::{BoostedTreeBuilder, BoostedTreeLimits};
pub use decision_tree::{DecisionTree, DecisionTreeParams};
pub use node::TreeNode;
pub use sampling::MaxFeatures;
