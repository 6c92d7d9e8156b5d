/// Scores candidate splits from weighted class distributions.
pub trait SplitCriterion {
    /// Impurity of a single class distribution.
    fn impurity(&self, distribution: &[f64]) -> f64;

    /// Impurity decrease achieved by splitting `pre_split` into `post_split`.
    fn merit_of_split(&self, pre_split: &[f64], post_split: &[&[f64]]) -> f64 {
        let total: f64 = pre_split.iter().sum();
        if total <= 0.0 {
            return 0.0;
        }
        let weighted_children: f64 = post_split
            .iter()
            .map(|d| {
                let w: f64 = d.iter().sum();
                if w > 0.0 { (w / total) * self.impurity(d) } else { 0.0 }
            })
            .sum();
        self.impurity(pre_split) - weighted_children
    }
}
