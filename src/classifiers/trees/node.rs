use serde::{Deserialize, Serialize};

/// Binary decision tree node. Rows with `row[feature] <= threshold` go left.
///
/// `L` is the leaf payload: a class distribution for classification trees,
/// a raw score for boosting trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode<L> {
    Leaf {
        value: L,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode<L>>,
        right: Box<TreeNode<L>>,
    },
}

impl<L> TreeNode<L> {
    pub fn leaf(value: L) -> Self {
        Self::Leaf { value }
    }

    pub fn split(feature: usize, threshold: f64, left: TreeNode<L>, right: TreeNode<L>) -> Self {
        Self::Split {
            feature,
            threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }

    /// Follows split tests down to the leaf that `row` falls into.
    pub fn leaf_for(&self, row: &[f64]) -> &L {
        let mut node = self;
        loop {
            match node {
                Self::Leaf { value } => return value,
                Self::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = row.get(*feature).copied().unwrap_or(f64::NAN);
                    node = if v <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Self::Leaf { .. } => 0,
            Self::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf { .. } => 1,
            Self::Split { left, right, .. } => left.leaf_count() + right.leaf_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump() -> TreeNode<f64> {
        TreeNode::split(1, 0.5, TreeNode::leaf(-1.0), TreeNode::leaf(1.0))
    }

    #[test]
    fn routes_on_threshold() {
        let t = stump();
        assert_eq!(*t.leaf_for(&[9.0, 0.5]), -1.0);
        assert_eq!(*t.leaf_for(&[9.0, 0.6]), 1.0);
    }

    #[test]
    fn reports_shape() {
        let t = TreeNode::split(0, 0.0, stump(), TreeNode::leaf(3.0));
        assert_eq!(t.depth(), 2);
        assert_eq!(t.leaf_count(), 3);
        assert!(!t.is_leaf());
    }

    #[test]
    fn tagged_json_layout() {
        let v = serde_json::to_value(stump()).unwrap();
        assert_eq!(v["kind"], "split");
        assert_eq!(v["left"]["kind"], "leaf");
        let back: TreeNode<f64> = serde_json::from_value(v).unwrap();
        assert_eq!(back, stump());
    }
}
