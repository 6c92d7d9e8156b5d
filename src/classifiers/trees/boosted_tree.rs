use crate::classifiers::trees::node::TreeNode;
use crate::classifiers::trees::sampling::sort_by_feature;

const MIN_GAIN: f64 = 1e-12;

/// Regularization and growth limits for one second-order boosting tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostedTreeLimits {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub min_child_weight: f64,
    pub reg_lambda: f64,
    pub reg_alpha: f64,
    pub gamma: f64,
}

impl BoostedTreeLimits {
    /// L1 soft-thresholding of a gradient sum.
    fn shrink(&self, g: f64) -> f64 {
        if g > self.reg_alpha {
            g - self.reg_alpha
        } else if g < -self.reg_alpha {
            g + self.reg_alpha
        } else {
            0.0
        }
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        let t = self.shrink(g);
        t * t / (h + self.reg_lambda).max(f64::MIN_POSITIVE)
    }

    /// Optimal leaf weight for the given gradient and hessian sums.
    pub fn leaf_weight(&self, g: f64, h: f64) -> f64 {
        -self.shrink(g) / (h + self.reg_lambda).max(f64::MIN_POSITIVE)
    }

    /// Loss reduction of splitting `(g, h)` into left and right parts.
    pub fn split_gain(&self, gl: f64, hl: f64, gr: f64, hr: f64) -> f64 {
        0.5 * (self.score(gl, hl) + self.score(gr, hr) - self.score(gl + gr, hl + hr)) - self.gamma
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Grows a regression tree over per-row gradients and hessians.
///
/// Leaves are scaled by `shrinkage`, so a fitted tree's output adds straight
/// onto the ensemble margin.
pub struct BoostedTreeBuilder<'a> {
    x: &'a [Vec<f64>],
    grad: &'a [f64],
    hess: &'a [f64],
    features: &'a [usize],
    limits: BoostedTreeLimits,
    shrinkage: f64,
}

impl<'a> BoostedTreeBuilder<'a> {
    pub fn new(
        x: &'a [Vec<f64>],
        grad: &'a [f64],
        hess: &'a [f64],
        features: &'a [usize],
        limits: BoostedTreeLimits,
        shrinkage: f64,
    ) -> Self {
        Self {
            x,
            grad,
            hess,
            features,
            limits,
            shrinkage,
        }
    }

    pub fn grow(&self, rows: Vec<usize>) -> TreeNode<f64> {
        self.build(rows, 0)
    }

    fn sums(&self, rows: &[usize]) -> (f64, f64) {
        rows.iter()
            .fold((0.0, 0.0), |(g, h), &i| (g + self.grad[i], h + self.hess[i]))
    }

    fn build(&self, rows: Vec<usize>, depth: usize) -> TreeNode<f64> {
        let (g, h) = self.sums(&rows);
        let leaf = || TreeNode::leaf(self.shrinkage * self.limits.leaf_weight(g, h));

        if depth >= self.limits.max_depth || rows.len() < self.limits.min_samples_split {
            return leaf();
        }
        let Some(best) = self.best_split(&rows, g, h) else {
            return leaf();
        };

        let (left, right): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&i| self.x[i][best.feature] <= best.threshold);
        TreeNode::split(
            best.feature,
            best.threshold,
            self.build(left, depth + 1),
            self.build(right, depth + 1),
        )
    }

    fn best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<BestSplit> {
        let limits = &self.limits;
        let mut best: Option<BestSplit> = None;
        let mut sorted = rows.to_vec();

        for &feature in self.features {
            sort_by_feature(self.x, &mut sorted, feature);
            let (mut gl, mut hl) = (0.0, 0.0);

            for pos in 0..sorted.len() - 1 {
                let i = sorted[pos];
                gl += self.grad[i];
                hl += self.hess[i];

                let n_left = pos + 1;
                if n_left < limits.min_samples_leaf
                    || sorted.len() - n_left < limits.min_samples_leaf
                {
                    continue;
                }
                let (gr, hr) = (g - gl, h - hl);
                if hl < limits.min_child_weight || hr < limits.min_child_weight {
                    continue;
                }
                let here = self.x[i][feature];
                let next = self.x[sorted[pos + 1]][feature];
                if here >= next {
                    continue;
                }

                let gain = limits.split_gain(gl, hl, gr, hr);
                if gain > MIN_GAIN && best.as_ref().is_none_or(|b| gain > b.gain) {
                    best = Some(BestSplit {
                        feature,
                        threshold: here + (next - here) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }
}
