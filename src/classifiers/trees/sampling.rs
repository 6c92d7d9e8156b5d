use rand::Rng;
use rand::seq::index;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How many features a tree node may consider when searching for a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    All,
    #[default]
    Sqrt,
    Log2,
    Count(usize),
}

impl MaxFeatures {
    pub fn resolve(self, n_features: usize) -> usize {
        let k = match self {
            Self::All => n_features,
            Self::Sqrt => (n_features as f64).sqrt() as usize,
            Self::Log2 => (n_features as f64).log2() as usize,
            Self::Count(k) => k,
        };
        k.clamp(1, n_features.max(1))
    }
}

/// `k` distinct feature indices, ascending.
pub fn feature_subset<R: Rng + ?Sized>(rng: &mut R, n_features: usize, k: usize) -> Vec<usize> {
    if k >= n_features {
        return (0..n_features).collect();
    }
    let mut picked = index::sample(rng, n_features, k).into_vec();
    picked.sort_unstable();
    picked
}

/// Bootstrap draw of `n` rows, returned as a multiplicity per row.
pub fn bootstrap_counts<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Vec<f64> {
    let mut counts = vec![0.0; n];
    for _ in 0..n {
        counts[rng.random_range(0..n)] += 1.0;
    }
    counts
}

/// Row indices drawn without replacement, keeping `fraction` of them (at least one).
pub fn row_subsample<R: Rng + ?Sized>(rng: &mut R, n: usize, fraction: f64) -> Vec<usize> {
    if fraction >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64 * fraction).round() as usize).clamp(1, n.max(1));
    let mut picked = index::sample(rng, n, k.min(n)).into_vec();
    picked.sort_unstable();
    picked
}

/// Sorts `rows` by their value in `feature`.
pub fn sort_by_feature(x: &[Vec<f64>], rows: &mut [usize], feature: usize) {
    rows.sort_unstable_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));
}
